//! Quad placement: pen advance, kerning, alignment and bounds.
//!
//! Drawing and measuring share one code path. `draw_text` emits quads into
//! the vertex batch; `text_bounds` runs the same pen arithmetic without
//! emitting, which is also how non-left alignment learns the total advance
//! before the real pass.

use crate::batch::VERTS_PER_QUAD;
use crate::context::{Origin, TextContext, SIZE_SCALE};
use crate::font::{FontId, GlyphRecord};
use crate::renderer::TextVertex;
use crate::state::Align;

/// Axis-aligned bounds of a laid-out string, in the caller's pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }
}

/// One glyph quad: screen corners plus normalized atlas UVs.
#[derive(Clone, Copy, Debug, Default)]
struct Quad {
    x0: f32,
    y0: f32,
    s0: f32,
    t0: f32,
    x1: f32,
    y1: f32,
    s1: f32,
    t1: f32,
}

impl TextContext {
    /// Draw `text` with the current state, anchored at `(x, y)`.
    ///
    /// Returns the pen x after the last glyph. Codepoints that cannot be
    /// resolved or rasterized are skipped without advancing the pen; the
    /// atlas-full condition additionally reaches the error callback from
    /// inside the glyph pipeline.
    pub fn draw_text(&mut self, mut x: f32, mut y: f32, text: &str) -> f32 {
        let state = *self.state();
        if state.font.0 >= self.fonts.len() {
            return x;
        }

        let size = (state.size * SIZE_SCALE) as i32;
        let blur = state.blur as i32;

        // Non-left alignment needs the unaligned advance first; the
        // measuring pass warms the same cache this pass draws from.
        if state.align.contains(Align::RIGHT) {
            let (advance, _) = self.text_bounds(x, y, text);
            x -= advance;
        } else if state.align.contains(Align::CENTER) {
            let (advance, _) = self.text_bounds(x, y, text);
            x -= advance * 0.5;
        }
        y += self.vert_align(state.font, state.align, size);

        let mut prev_index: Option<u16> = None;
        for codepoint in text.chars() {
            let glyph = match self.glyph(state.font, codepoint, size, blur) {
                Ok(Some(i)) => self.glyph_record(state.font, i),
                Ok(None) => {
                    prev_index = None;
                    continue;
                }
                Err(err) => {
                    log::warn!("skipping {codepoint:?}: {err}");
                    prev_index = None;
                    continue;
                }
            };

            let quad = self.make_quad(state.font, prev_index, &glyph, state.spacing, &mut x, y);
            self.push_quad(&quad, state.color);
            prev_index = Some(glyph.index);
        }
        self.flush();

        x
    }

    /// Measure `text` without emitting quads.
    ///
    /// Returns the horizontal advance and the bounds of every would-be quad,
    /// with the current alignment applied, so measurement and drawing always
    /// agree for identical state.
    pub fn text_bounds(&mut self, mut x: f32, mut y: f32, text: &str) -> (f32, Bounds) {
        let state = *self.state();
        if state.font.0 >= self.fonts.len() {
            return (0.0, Bounds::default());
        }

        let size = (state.size * SIZE_SCALE) as i32;
        let blur = state.blur as i32;

        y += self.vert_align(state.font, state.align, size);
        let start_x = x;

        let mut min_x = x;
        let mut max_x = x;
        let mut min_y = y;
        let mut max_y = y;

        let mut prev_index: Option<u16> = None;
        for codepoint in text.chars() {
            let glyph = match self.glyph(state.font, codepoint, size, blur) {
                Ok(Some(i)) => self.glyph_record(state.font, i),
                Ok(None) | Err(_) => {
                    prev_index = None;
                    continue;
                }
            };

            let quad = self.make_quad(state.font, prev_index, &glyph, state.spacing, &mut x, y);

            min_x = min_x.min(quad.x0);
            max_x = max_x.max(quad.x1);
            match self.origin {
                Origin::TopLeft => {
                    min_y = min_y.min(quad.y0);
                    max_y = max_y.max(quad.y1);
                }
                Origin::BottomLeft => {
                    min_y = min_y.min(quad.y1);
                    max_y = max_y.max(quad.y0);
                }
            }
            prev_index = Some(glyph.index);
        }

        let advance = x - start_x;

        // Shift the box the same way the draw pass shifts its start.
        if state.align.contains(Align::RIGHT) {
            min_x -= advance;
            max_x -= advance;
        } else if state.align.contains(Align::CENTER) {
            min_x -= advance * 0.5;
            max_x -= advance * 0.5;
        }

        (
            advance,
            Bounds {
                min: [min_x, min_y],
                max: [max_x, max_y],
            },
        )
    }

    /// Ascender, descender and line height for the current font, scaled by
    /// the current size.
    pub fn vertical_metrics(&self) -> Option<(f32, f32, f32)> {
        let state = self.state();
        let font = self.fonts.get(state.font.0)?;
        let m = font.metrics;
        Some((
            m.ascender * state.size,
            m.descender * state.size,
            m.line_height * state.size,
        ))
    }

    /// Vertical extent `(min_y, max_y)` of a text line anchored at `y` under
    /// the current state.
    pub fn line_bounds(&self, y: f32) -> (f32, f32) {
        let state = self.state();
        let Some(font) = self.fonts.get(state.font.0) else {
            return (y, y);
        };
        let size = (state.size * SIZE_SCALE) as i32;
        let y = y + self.vert_align(state.font, state.align, size);
        let m = font.metrics;

        match self.origin {
            Origin::TopLeft => {
                let min_y = y - m.ascender * state.size;
                (min_y, min_y + m.line_height * state.size)
            }
            Origin::BottomLeft => {
                let max_y = y + m.descender * state.size;
                (max_y - m.line_height * state.size, max_y)
            }
        }
    }

    /// Baseline shift for the vertical alignment flags, sign-flipped by the
    /// origin convention.
    fn vert_align(&self, font: FontId, align: Align, size: i32) -> f32 {
        let metrics = self.fonts[font.0].metrics;
        let size = size as f32 / SIZE_SCALE;
        let sign = match self.origin {
            Origin::TopLeft => 1.0,
            Origin::BottomLeft => -1.0,
        };

        if align.contains(Align::TOP) {
            sign * metrics.ascender * size
        } else if align.contains(Align::MIDDLE) {
            sign * (metrics.ascender + metrics.descender) * 0.5 * size
        } else if align.contains(Align::BOTTOM) {
            sign * metrics.descender * size
        } else {
            // Baseline: the anchor is the baseline itself.
            0.0
        }
    }

    /// Apply kerning and spacing to the pen, build the glyph's quad, then
    /// advance the pen. Corner positions snap to whole pixels, matching
    /// fixed-step text rendering.
    fn make_quad(
        &self,
        font: FontId,
        prev: Option<u16>,
        glyph: &GlyphRecord,
        spacing: f32,
        x: &mut f32,
        y: f32,
    ) -> Quad {
        if let Some(prev) = prev {
            let kern = self.fonts[font.0]
                .face
                .kern(prev, glyph.index, glyph.size as f32 / SIZE_SCALE);
            *x += (kern + spacing + 0.5) as i32 as f32;
        }

        // Step in by the 1px transparent border around the packed bitmap.
        let x_off = (glyph.x_off + 1) as f32;
        let y_off = (glyph.y_off + 1) as f32;
        let x0 = (glyph.x0 + 1) as f32;
        let y0 = (glyph.y0 + 1) as f32;
        let x1 = (glyph.x1 - 1) as f32;
        let y1 = (glyph.y1 - 1) as f32;

        let mut quad = Quad::default();
        let rx = (*x + x_off) as i32 as f32;
        match self.origin {
            Origin::TopLeft => {
                let ry = (y + y_off) as i32 as f32;
                quad.x0 = rx;
                quad.y0 = ry;
                quad.x1 = rx + (x1 - x0);
                quad.y1 = ry + (y1 - y0);
            }
            Origin::BottomLeft => {
                let ry = (y - y_off) as i32 as f32;
                quad.x0 = rx;
                quad.y0 = ry;
                quad.x1 = rx + (x1 - x0);
                quad.y1 = ry - (y1 - y0);
            }
        }
        quad.s0 = x0 * self.inv_width;
        quad.t0 = y0 * self.inv_height;
        quad.s1 = x1 * self.inv_width;
        quad.t1 = y1 * self.inv_height;

        *x += (glyph.x_advance as f32 / SIZE_SCALE + 0.5) as i32 as f32;
        quad
    }

    /// Append the quad's two triangles, flushing first when the batch would
    /// overflow. Flushes can therefore land mid-string.
    fn push_quad(&mut self, q: &Quad, color: u32) {
        if self.batch.would_overflow(VERTS_PER_QUAD) {
            self.flush();
        }

        self.batch
            .push(TextVertex::new([q.x0, q.y0], [q.s0, q.t0], color));
        self.batch
            .push(TextVertex::new([q.x1, q.y1], [q.s1, q.t1], color));
        self.batch
            .push(TextVertex::new([q.x1, q.y0], [q.s1, q.t0], color));

        self.batch
            .push(TextVertex::new([q.x0, q.y0], [q.s0, q.t0], color));
        self.batch
            .push(TextVertex::new([q.x0, q.y1], [q.s0, q.t1], color));
        self.batch
            .push(TextVertex::new([q.x1, q.y1], [q.s1, q.t1], color));
    }
}
