//! fontdue-backed font shaping for `vellum`.
//!
//! Wraps a parsed [`fontdue::Font`] behind vellum's [`FontFace`]
//! collaborator trait: codepoint resolution, coverage rasterization and
//! kerning all come straight from fontdue.
//!
//! ```no_run
//! use vellum::{ContextOptions, TextContext};
//! use vellum_fontdue::FontdueFace;
//!
//! # fn main() -> Result<(), vellum::TextError> {
//! let bytes = std::fs::read("DejaVuSans.ttf").expect("font file");
//! let face = FontdueFace::from_bytes(&bytes)?;
//!
//! let mut ctx = TextContext::new(ContextOptions::default())?;
//! let font = ctx.add_font("sans", bytes, Box::new(face));
//! ctx.set_font(font);
//! ctx.draw_text(10.0, 40.0, "hello");
//! # Ok(())
//! # }
//! ```

use fontdue::{Font, FontSettings};
use vellum::{CoverageBitmap, FaceError, FaceMetrics, FontFace};

/// A parsed font face rasterized through fontdue.
pub struct FontdueFace {
    font: Font,
}

impl FontdueFace {
    /// Parse TTF/OTF font bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FaceError> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| FaceError::Parse(err.to_string()))?;
        Ok(Self { font })
    }

    /// The wrapped fontdue font, for callers that want its full surface.
    pub fn font(&self) -> &Font {
        &self.font
    }
}

impl FontFace for FontdueFace {
    fn metrics(&self) -> FaceMetrics {
        // fontdue scales line metrics linearly with the requested size, so
        // metrics at 1 px are exactly the unit-em fractions.
        match self.font.horizontal_line_metrics(1.0) {
            Some(m) => FaceMetrics {
                ascender: m.ascent,
                descender: m.descent,
                line_height: m.new_line_size,
            },
            None => FaceMetrics {
                ascender: 0.75,
                descender: -0.25,
                line_height: 1.0,
            },
        }
    }

    fn glyph_index(&self, codepoint: char) -> u16 {
        self.font.lookup_glyph_index(codepoint)
    }

    fn rasterize(&mut self, glyph: u16, size_px: f32) -> Result<CoverageBitmap, FaceError> {
        let (metrics, coverage) = self.font.rasterize_indexed(glyph, size_px);
        Ok(CoverageBitmap {
            width: metrics.width,
            height: metrics.height,
            left: metrics.xmin,
            // fontdue reports ymin upward from the baseline; vellum wants
            // the y-down offset of the bitmap's top edge.
            top: -(metrics.ymin + metrics.height as i32),
            advance: metrics.advance_width,
            coverage,
        })
    }

    fn kern(&self, left: u16, right: u16, size_px: f32) -> f32 {
        self.font
            .horizontal_kern_indexed(left, right, size_px)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let result = FontdueFace::from_bytes(&[0u8, 1, 2, 3]);
        assert!(matches!(result, Err(FaceError::Parse(_))));
    }
}
