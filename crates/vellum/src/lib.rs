//! # vellum
//!
//! Online glyph-atlas management for text rendering.
//!
//! Vellum rasterizes each requested (font, codepoint, size, blur) glyph at
//! most once, packs its bitmap into a shared single-channel texture atlas
//! with a skyline bin-packer, caches the result, and emits draw-ready
//! vertex quads positioned by font metrics, kerning and alignment. It
//! serves any renderer that needs to draw arbitrary strings without
//! pre-baking a font texture.
//!
//! # Design goals
//! - **Backend-agnostic**: rendering goes through [`Renderer`] and font
//!   shaping through [`FontFace`]; the core depends on no GPU API and no
//!   font parser. `vellum-fontdue` supplies a ready-made face.
//! - **Incremental**: texture damage accumulates in a dirty rect and quads
//!   batch up to [`MAX_VERTICES`], so renderer calls stay coarse no matter
//!   how text arrives.
//! - **Online**: glyphs rasterize and pack on first use; no pre-baked
//!   character sets, and the atlas can grow or reset mid-run.
//!
//! A typical frame:
//! 1. [`TextContext::draw_text`] walks a string, resolving each codepoint
//!    through the glyph cache and rasterizing misses into the atlas.
//! 2. Quads accumulate in the vertex batch; the renderer's `update` and
//!    `draw` run when the batch fills and once at the end of the call.
//! 3. On [`TextError::AtlasFull`] the error callback may grow the atlas
//!    synchronously; the failed placement is retried once.

mod atlas;
mod batch;
mod context;
mod error;
mod font;
mod layout;
mod renderer;
mod shaper;
mod state;
mod texture;

pub use atlas::*;
pub use batch::MAX_VERTICES;
pub use context::*;
pub use error::*;
pub use font::FontId;
pub use layout::*;
pub use renderer::*;
pub use shaper::*;
pub use state::*;
pub use texture::PixelRect;
