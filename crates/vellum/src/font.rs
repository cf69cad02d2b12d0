//! Per-font glyph records and the hash-chain cache index.

use crate::shaper::{FaceMetrics, FontFace};

/// Handle to a font registered with a [`TextContext`](crate::TextContext).
///
/// Plain index into the context's font table. Handles stay valid for the
/// lifetime of the context; glyph caches are invalidated wholesale on atlas
/// reset, never reallocated per font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub usize);

pub(crate) const HASH_LUT_SIZE: usize = 256;

/// One rasterized glyph in the atlas. Identity is (codepoint, size, blur);
/// never mutated after creation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GlyphRecord {
    pub codepoint: char,
    /// Glyph index in the face that rasterized it (possibly a fallback).
    pub index: u16,
    /// Font size in fixed point (×10).
    pub size: i32,
    pub blur: i32,
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    /// Horizontal advance in fixed point (×10).
    pub x_advance: i32,
    pub x_off: i32,
    pub y_off: i32,
    /// Next record in the same hash bucket; index into the glyph arena.
    pub next: Option<usize>,
}

/// A registered font: its shaping face plus the cached glyph arena.
pub(crate) struct FontEntry {
    pub name: String,
    /// Raw font bytes as handed to `add_font`; kept so embedders can
    /// re-derive face state without holding their own copy.
    pub data: Vec<u8>,
    pub metrics: FaceMetrics,
    pub face: Box<dyn FontFace>,
    pub glyphs: Vec<GlyphRecord>,
    lut: Vec<Option<usize>>,
    pub fallbacks: Vec<FontId>,
}

impl FontEntry {
    pub fn new(name: String, data: Vec<u8>, face: Box<dyn FontFace>) -> Self {
        let metrics = face.metrics();
        Self {
            name,
            data,
            metrics,
            face,
            glyphs: Vec::with_capacity(256),
            lut: vec![None; HASH_LUT_SIZE],
            fallbacks: Vec::new(),
        }
    }

    /// Walk the bucket chain for an exact (codepoint, size, blur) match.
    pub fn lookup(&self, codepoint: char, size: i32, blur: i32) -> Option<usize> {
        let mut slot = self.lut[bucket(codepoint)];
        while let Some(i) = slot {
            let g = &self.glyphs[i];
            if g.codepoint == codepoint && g.size == size && g.blur == blur {
                return Some(i);
            }
            slot = g.next;
        }
        None
    }

    /// Append a record and link it at the head of its bucket chain.
    pub fn insert(&mut self, mut record: GlyphRecord) -> usize {
        let b = bucket(record.codepoint);
        record.next = self.lut[b];
        self.glyphs.push(record);
        let idx = self.glyphs.len() - 1;
        self.lut[b] = Some(idx);
        idx
    }

    /// Cut every chain and drop the arena. Records live in a Vec, so
    /// clearing cannot leave dangling links.
    pub fn clear_cache(&mut self) {
        self.glyphs.clear();
        self.lut.iter_mut().for_each(|slot| *slot = None);
    }
}

fn bucket(codepoint: char) -> usize {
    hash(codepoint as u32) as usize & (HASH_LUT_SIZE - 1)
}

/// 32-bit avalanche mix so dense codepoint ranges spread across buckets.
fn hash(mut a: u32) -> u32 {
    a = a.wrapping_add(!(a << 15));
    a ^= a >> 10;
    a = a.wrapping_add(a << 3);
    a ^= a >> 6;
    a = a.wrapping_add(!(a << 11));
    a ^= a >> 16;
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceError;
    use crate::shaper::CoverageBitmap;

    struct NullFace;

    impl FontFace for NullFace {
        fn metrics(&self) -> FaceMetrics {
            FaceMetrics {
                ascender: 0.75,
                descender: -0.25,
                line_height: 1.0,
            }
        }

        fn glyph_index(&self, _codepoint: char) -> u16 {
            1
        }

        fn rasterize(&mut self, _glyph: u16, _size_px: f32) -> Result<CoverageBitmap, FaceError> {
            Ok(CoverageBitmap::default())
        }

        fn kern(&self, _left: u16, _right: u16, _size_px: f32) -> f32 {
            0.0
        }
    }

    fn record(codepoint: char, size: i32, blur: i32) -> GlyphRecord {
        GlyphRecord {
            codepoint,
            index: 1,
            size,
            blur,
            x0: 0,
            y0: 0,
            x1: 4,
            y1: 4,
            x_advance: 40,
            x_off: 0,
            y_off: 0,
            next: None,
        }
    }

    #[test]
    fn lookup_distinguishes_size_and_blur() {
        let mut font = FontEntry::new("test".into(), Vec::new(), Box::new(NullFace));
        let a = font.insert(record('a', 240, 0));
        let b = font.insert(record('a', 240, 4));
        let c = font.insert(record('a', 120, 0));

        assert_eq!(font.lookup('a', 240, 0), Some(a));
        assert_eq!(font.lookup('a', 240, 4), Some(b));
        assert_eq!(font.lookup('a', 120, 0), Some(c));
        assert_eq!(font.lookup('a', 480, 0), None);
        assert_eq!(font.lookup('b', 240, 0), None);
    }

    #[test]
    fn chains_survive_bucket_collisions() {
        let mut font = FontEntry::new("test".into(), Vec::new(), Box::new(NullFace));

        // Everything inserted must come back out, whatever bucket it hashed
        // into.
        let mut expected = Vec::new();
        for (i, codepoint) in ('\u{20}'..'\u{220}').enumerate() {
            let size = 100 + i as i32;
            expected.push((codepoint, size, font.insert(record(codepoint, size, 0))));
        }
        for (codepoint, size, idx) in expected {
            assert_eq!(font.lookup(codepoint, size, 0), Some(idx));
        }
    }

    #[test]
    fn clear_cache_cuts_all_chains() {
        let mut font = FontEntry::new("test".into(), Vec::new(), Box::new(NullFace));
        font.insert(record('x', 240, 0));
        font.insert(record('y', 240, 0));
        font.clear_cache();

        assert_eq!(font.lookup('x', 240, 0), None);
        assert_eq!(font.lookup('y', 240, 0), None);
        assert!(font.glyphs.is_empty());
    }
}
