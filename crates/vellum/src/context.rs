//! The owning context: fonts, atlas, texture, batch and the glyph pipeline.

use log::warn;

use crate::atlas::SkylineAtlas;
use crate::batch::VertexBatch;
use crate::error::TextError;
use crate::font::{FontEntry, FontId, GlyphRecord};
use crate::renderer::Renderer;
use crate::shaper::FontFace;
use crate::state::{Align, DrawState, MAX_STATES};
use crate::texture::AtlasTexture;

/// Vertical origin convention of the embedding application's coordinate
/// system. Consulted by all vertical quad math.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Origin {
    /// y grows downward from the top-left corner.
    #[default]
    TopLeft,
    /// y grows upward from the bottom-left corner.
    BottomLeft,
}

/// Construction parameters for [`TextContext`].
#[derive(Clone, Copy, Debug)]
pub struct ContextOptions {
    /// Initial atlas width in texels.
    pub width: usize,
    /// Initial atlas height in texels.
    pub height: usize,
    pub origin: Origin,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            origin: Origin::TopLeft,
        }
    }
}

/// Callback invoked on non-fatal conditions.
///
/// It receives the context itself so an atlas-full handler can grow the
/// atlas synchronously before the pipeline's single retry.
pub type ErrorCallback = Box<dyn FnMut(&mut TextContext, TextError)>;

/// Fixed-point scale applied to sizes and advances before integer storage.
pub(crate) const SIZE_SCALE: f32 = 10.0;
/// Smallest renderable size in fixed units (2.0 px).
const MIN_SIZE_FIXED: i32 = 20;
const MAX_BLUR: i32 = 20;
/// Transparent border reserved around every glyph bitmap, on top of the
/// blur radius, so bilinear sampling never picks up a neighbor.
const GLYPH_PADDING: i32 = 2;
const WHITE_RECT_SIZE: i32 = 2;

/// Glyph-atlas text context.
///
/// Owns the atlas texture, the per-font glyph caches, the vertex batch and
/// the draw-state stack. Single-threaded: every operation runs to completion
/// on the calling thread.
pub struct TextContext {
    pub(crate) origin: Origin,
    pub(crate) atlas: SkylineAtlas,
    pub(crate) texture: AtlasTexture,
    pub(crate) inv_width: f32,
    pub(crate) inv_height: f32,
    pub(crate) fonts: Vec<FontEntry>,
    pub(crate) states: Vec<DrawState>,
    pub(crate) batch: VertexBatch,
    pub(crate) renderer: Option<Box<dyn Renderer>>,
    error_callback: Option<ErrorCallback>,
}

impl TextContext {
    /// Create a context with an empty atlas.
    ///
    /// Fails only on a malformed configuration (zero-sized atlas).
    pub fn new(options: ContextOptions) -> Result<Self, TextError> {
        if options.width == 0 || options.height == 0 {
            return Err(TextError::Config("atlas dimensions must be non-zero"));
        }

        let mut ctx = Self {
            origin: options.origin,
            atlas: SkylineAtlas::new(options.width as i32, options.height as i32),
            texture: AtlasTexture::new(options.width, options.height),
            inv_width: 1.0 / options.width as f32,
            inv_height: 1.0 / options.height as f32,
            fonts: Vec::new(),
            states: vec![DrawState::default()],
            batch: VertexBatch::new(),
            renderer: None,
            error_callback: None,
        };
        ctx.add_white_rect(WHITE_RECT_SIZE, WHITE_RECT_SIZE);
        Ok(ctx)
    }

    /// Install the backend notified of texture updates and draws.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    /// Install the handler for non-fatal conditions (`AtlasFull`,
    /// `StatesOverflow`, `StatesUnderflow`).
    pub fn set_error_callback(
        &mut self,
        callback: impl FnMut(&mut TextContext, TextError) + 'static,
    ) {
        self.error_callback = Some(Box::new(callback));
    }

    /// Route a condition through the installed callback, if any.
    ///
    /// The callback is moved out for the duration of the call so it can
    /// re-enter the context, e.g. grow the atlas on `AtlasFull`.
    fn report(&mut self, error: TextError) {
        if let Some(mut callback) = self.error_callback.take() {
            callback(self, error);
            // The handler may have installed a replacement; keep that one.
            if self.error_callback.is_none() {
                self.error_callback = Some(callback);
            }
        }
    }

    // --- fonts ---

    /// Register a font. `data` holds the raw font bytes, `face` supplies all
    /// shaping services for them.
    pub fn add_font(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
        face: Box<dyn FontFace>,
    ) -> FontId {
        let name = name.into();
        log::debug!("registering font {name:?}");
        self.fonts.push(FontEntry::new(name, data, face));
        FontId(self.fonts.len() - 1)
    }

    /// Find a registered font by name.
    pub fn font_by_name(&self, name: &str) -> Option<FontId> {
        self.fonts.iter().position(|f| f.name == name).map(FontId)
    }

    /// Raw bytes a font was registered with.
    pub fn font_data(&self, font: FontId) -> Option<&[u8]> {
        self.fonts.get(font.0).map(|f| f.data.as_slice())
    }

    /// Let `base` resolve codepoints through `fallback` when its own cmap
    /// has no entry. Fallbacks apply in registration order. Returns false
    /// for unknown ids.
    pub fn add_fallback(&mut self, base: FontId, fallback: FontId) -> bool {
        if base.0 >= self.fonts.len() || fallback.0 >= self.fonts.len() {
            return false;
        }
        self.fonts[base.0].fallbacks.push(fallback);
        true
    }

    // --- draw state ---

    /// Duplicate the current state onto the stack.
    pub fn push_state(&mut self) {
        if self.states.len() >= MAX_STATES {
            warn!("draw state stack overflow");
            self.report(TextError::StatesOverflow);
            return;
        }
        let top = *self.state();
        self.states.push(top);
    }

    /// Restore the previously pushed state. The base state never pops.
    pub fn pop_state(&mut self) {
        if self.states.len() <= 1 {
            warn!("draw state stack underflow");
            self.report(TextError::StatesUnderflow);
            return;
        }
        self.states.pop();
    }

    /// Reset the current state to defaults without touching the stack.
    pub fn clear_state(&mut self) {
        *self.state_mut() = DrawState::default();
    }

    pub fn set_font(&mut self, font: FontId) {
        self.state_mut().font = font;
    }

    pub fn set_size(&mut self, size: f32) {
        self.state_mut().size = size;
    }

    pub fn set_color(&mut self, color: u32) {
        self.state_mut().color = color;
    }

    pub fn set_blur(&mut self, blur: f32) {
        self.state_mut().blur = blur;
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        self.state_mut().spacing = spacing;
    }

    pub fn set_align(&mut self, align: Align) {
        self.state_mut().align = align;
    }

    pub(crate) fn state(&self) -> &DrawState {
        self.states.last().expect("state stack holds the base state")
    }

    fn state_mut(&mut self) -> &mut DrawState {
        self.states.last_mut().expect("state stack holds the base state")
    }

    // --- atlas queries ---

    /// Current atlas dimensions in texels.
    pub fn atlas_size(&self) -> (usize, usize) {
        (self.texture.width(), self.texture.height())
    }

    /// Raw single-channel texels, row-major at atlas-width stride. Useful
    /// for software renderers and tests.
    pub fn texture_data(&self) -> &[u8] {
        self.texture.data()
    }

    // --- glyph pipeline ---

    /// Cache lookup with rasterize-on-miss.
    ///
    /// Returns the record's index in the font's glyph arena. `Ok(None)`
    /// means "nothing to draw" (degenerate size, or a codepoint neither the
    /// font nor its fallbacks can resolve) and consumes no atlas space.
    /// `Err(AtlasFull)` means the atlas stayed full even after the
    /// notification retry.
    pub(crate) fn glyph(
        &mut self,
        font_id: FontId,
        codepoint: char,
        size: i32,
        blur: i32,
    ) -> Result<Option<usize>, TextError> {
        if size < MIN_SIZE_FIXED {
            return Ok(None);
        }
        let blur = blur.clamp(0, MAX_BLUR);
        let pad = blur + GLYPH_PADDING;

        if let Some(hit) = self.fonts[font_id.0].lookup(codepoint, size, blur) {
            return Ok(Some(hit));
        }

        // Resolve the glyph index, walking fallbacks on notdef. The record
        // lands in the requesting font's cache either way.
        let mut index = self.fonts[font_id.0].face.glyph_index(codepoint);
        let mut render_font = font_id;
        if index == 0 {
            for i in 0..self.fonts[font_id.0].fallbacks.len() {
                let fb = self.fonts[font_id.0].fallbacks[i];
                let fb_index = self.fonts[fb.0].face.glyph_index(codepoint);
                if fb_index != 0 {
                    index = fb_index;
                    render_font = fb;
                    break;
                }
            }
            if index == 0 {
                return Ok(None);
            }
        }

        let size_px = size as f32 / SIZE_SCALE;
        let bitmap = self.fonts[render_font.0].face.rasterize(index, size_px)?;

        let gw = bitmap.width as i32 + pad * 2;
        let gh = bitmap.height as i32 + pad * 2;

        // One retry after notifying: the callback is the caller's only
        // chance to grow the atlas before this placement is abandoned.
        let (gx, gy) = match self.atlas.add_rect(gw, gh) {
            Some(spot) => spot,
            None => {
                warn!("glyph atlas full ({gw}x{gh} requested)");
                self.report(TextError::AtlasFull);
                self.atlas.add_rect(gw, gh).ok_or(TextError::AtlasFull)?
            }
        };

        self.texture.copy_coverage(gx + pad, gy + pad, &bitmap);
        if blur > 0 {
            self.texture.blur(gx, gy, gw, gh, blur);
        }
        self.texture.mark_dirty(gx, gy, gx + gw, gy + gh);

        let record = GlyphRecord {
            codepoint,
            index,
            size,
            blur,
            x0: gx,
            y0: gy,
            x1: gx + gw,
            y1: gy + gh,
            x_advance: (bitmap.advance * SIZE_SCALE) as i32,
            x_off: bitmap.left - pad,
            y_off: bitmap.top - pad,
            next: None,
        };
        Ok(Some(self.fonts[font_id.0].insert(record)))
    }

    pub(crate) fn glyph_record(&self, font: FontId, index: usize) -> GlyphRecord {
        self.fonts[font.0].glyphs[index]
    }

    // --- flush, resize, reset ---

    /// Push pending texture damage and vertices to the renderer.
    ///
    /// Runs automatically at the end of every draw call, whenever the batch
    /// fills mid-string, and before any atlas storage change. A no-op when
    /// nothing is pending.
    pub fn flush(&mut self) {
        if let Some(dirty) = self.texture.take_dirty() {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.update(dirty, self.texture.data(), self.texture.width());
            }
        }
        if !self.batch.is_empty() {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.draw(self.batch.vertices());
            }
            self.batch.clear();
        }
    }

    /// Grow the atlas. Dimensions never shrink; existing glyphs keep their
    /// placements, and the previously used region is re-uploaded on the
    /// next flush since a resized backend texture may not keep its
    /// contents.
    pub fn expand_atlas(&mut self, width: usize, height: usize) -> bool {
        let width = width.max(self.texture.width());
        let height = height.max(self.texture.height());
        if width == self.texture.width() && height == self.texture.height() {
            return true;
        }

        // The renderer must see a consistent frame before storage changes.
        self.flush();

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }

        self.texture.grow(width, height);
        self.atlas.expand(width as i32, height as i32);

        let used_y = self.atlas.max_y();
        self.texture.mark_dirty(0, 0, width as i32, used_y);

        self.inv_width = 1.0 / width as f32;
        self.inv_height = 1.0 / height as f32;
        true
    }

    /// Throw every placement and cached glyph away and start over with an
    /// empty atlas of the given size. Any glyph requested afterwards is a
    /// guaranteed cache miss.
    pub fn reset_atlas(&mut self, width: usize, height: usize) -> Result<(), TextError> {
        if width == 0 || height == 0 {
            return Err(TextError::Config("atlas dimensions must be non-zero"));
        }

        self.flush();

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }

        self.atlas.reset(width as i32, height as i32);
        self.texture.reset(width, height);

        for font in &mut self.fonts {
            font.clear_cache();
        }

        self.inv_width = 1.0 / width as f32;
        self.inv_height = 1.0 / height as f32;

        self.add_white_rect(WHITE_RECT_SIZE, WHITE_RECT_SIZE);
        Ok(())
    }

    /// Pack a small opaque rectangle for debug and underline drawing.
    /// Skipped silently when the atlas cannot host it.
    fn add_white_rect(&mut self, w: i32, h: i32) {
        let Some((gx, gy)) = self.atlas.add_rect(w, h) else {
            return;
        };
        self.texture.fill(gx, gy, w, h, 0xff);
        self.texture.mark_dirty(gx, gy, gx + w, gy + h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sized_atlas() {
        let result = TextContext::new(ContextOptions {
            width: 0,
            height: 256,
            ..Default::default()
        });
        assert!(matches!(result, Err(TextError::Config(_))));
    }

    #[test]
    fn white_rect_is_packed_at_creation() {
        let ctx = TextContext::new(ContextOptions::default()).unwrap();
        // The debug rect occupies the atlas origin.
        assert_eq!(ctx.texture_data()[0], 0xff);
        assert_eq!(ctx.texture_data()[513], 0xff);
    }

    #[test]
    fn push_copies_and_pop_restores() {
        let mut ctx = TextContext::new(ContextOptions::default()).unwrap();
        ctx.set_color(0x11223344);
        ctx.push_state();
        ctx.set_color(0xdeadbeef);
        assert_eq!(ctx.state().color, 0xdeadbeef);
        ctx.pop_state();
        assert_eq!(ctx.state().color, 0x11223344);
    }

    #[test]
    fn stack_misuse_hits_the_callback() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut ctx = TextContext::new(ContextOptions::default()).unwrap();
        let seen: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let log = seen.clone();
        ctx.set_error_callback(move |_, err| {
            log.borrow_mut().push(match err {
                TextError::StatesOverflow => "overflow",
                TextError::StatesUnderflow => "underflow",
                _ => "other",
            });
        });

        ctx.pop_state();
        for _ in 0..MAX_STATES + 1 {
            ctx.push_state();
        }

        let seen = seen.borrow();
        assert_eq!(seen[0], "underflow");
        assert!(seen.contains(&"overflow"));
    }

    #[test]
    fn clear_state_restores_defaults() {
        let mut ctx = TextContext::new(ContextOptions::default()).unwrap();
        ctx.set_size(40.0);
        ctx.set_align(Align::RIGHT | Align::TOP);
        ctx.clear_state();
        assert_eq!(ctx.state().size, 12.0);
        assert_eq!(ctx.state().align, Align::default());
    }
}
