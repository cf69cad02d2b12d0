//! Renderer collaborator interface and the vertex format it consumes.

use bytemuck::{Pod, Zeroable};

use crate::texture::PixelRect;

/// Vertex format for glyph quads.
///
/// Positions are in the caller's pixel space, UVs are normalized atlas
/// coordinates. The 32-bit color is carried through untouched; its byte
/// order is a contract between the embedding application and its renderer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: u32,
}

impl TextVertex {
    pub const fn new(pos: [f32; 2], uv: [f32; 2], color: u32) -> Self {
        Self { pos, uv, color }
    }
}

/// Backend notifications issued by the context.
///
/// Any concrete backend satisfies this: a GPU pipeline, a software blitter,
/// a headless test double. The core never special-cases one.
pub trait Renderer {
    /// The atlas texture is about to change to the given dimensions.
    fn resize(&mut self, width: usize, height: usize);

    /// Texels inside `dirty` changed since the last flush. `texels` is the
    /// full texture at `stride` bytes per row; the backend extracts the
    /// sub-rectangle itself.
    fn update(&mut self, dirty: PixelRect, texels: &[u8], stride: usize);

    /// Draw accumulated quads, in emission order. `vertices.len()` is always
    /// a non-zero multiple of 6: two triangles per glyph quad, no index
    /// buffer.
    fn draw(&mut self, vertices: &[TextVertex]);
}
