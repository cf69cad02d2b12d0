//! Error taxonomy.

use thiserror::Error;

/// Non-fatal conditions reported by the context.
///
/// Capacity errors (`AtlasFull`, `StatesOverflow`, `StatesUnderflow`) leave
/// the context usable; the caller recovers by growing the atlas or balancing
/// push/pop. `Face` errors come from the font-shaping collaborator and
/// affect only the glyph that triggered them.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("glyph atlas is full")]
    AtlasFull,

    #[error("draw state stack overflow")]
    StatesOverflow,

    #[error("draw state stack underflow")]
    StatesUnderflow,

    #[error("invalid configuration: {0}")]
    Config(&'static str),

    #[error("font face error: {0}")]
    Face(#[from] FaceError),
}

/// Failures surfaced by a [`FontFace`](crate::FontFace) implementation.
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("failed to parse font data: {0}")]
    Parse(String),

    #[error("failed to rasterize glyph {glyph}: {reason}")]
    Raster { glyph: u16, reason: String },
}
