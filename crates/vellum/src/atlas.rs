//! Skyline bin-packing for the glyph atlas.
//!
//! Free space above the packed glyphs is tracked as a "skyline": a list of
//! horizontal segments, sorted by x, that together cover the full atlas
//! width with no gaps and no overlaps. New rectangles drop onto the skyline
//! like tetris pieces and raise it where they land.

/// One horizontal run of the skyline at height `y`, spanning `[x, x + width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    x: i32,
    y: i32,
    width: i32,
}

const INIT_SEGMENTS: usize = 256;

/// Skyline allocator for a fixed-size atlas.
///
/// `add_rect` is the only way space is consumed. Running out of space is a
/// normal outcome (`None`), at which point the owner grows or resets the
/// atlas.
pub struct SkylineAtlas {
    width: i32,
    height: i32,
    segments: Vec<Segment>,
}

impl SkylineAtlas {
    pub fn new(width: i32, height: i32) -> Self {
        let mut segments = Vec::with_capacity(INIT_SEGMENTS);
        segments.push(Segment { x: 0, y: 0, width });
        Self {
            width,
            height,
            segments,
        }
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Highest segment top, i.e. the vertical extent of everything placed
    /// so far.
    pub fn max_y(&self) -> i32 {
        self.segments.iter().map(|s| s.y).max().unwrap_or(0)
    }

    /// Widen and/or heighten the atlas. Existing placements are untouched;
    /// added width joins the skyline as a fresh zero-height segment.
    pub fn expand(&mut self, width: i32, height: i32) {
        if width > self.width {
            self.segments.push(Segment {
                x: self.width,
                y: 0,
                width: width - self.width,
            });
        }
        self.width = width;
        self.height = height;
    }

    /// Discard all placements and start over at the given size.
    pub fn reset(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
        self.segments.clear();
        self.segments.push(Segment { x: 0, y: 0, width });
    }

    /// Place a `w`×`h` rectangle, returning its top-left corner, or `None`
    /// when no segment can host it.
    pub fn add_rect(&mut self, w: i32, h: i32) -> Option<(i32, i32)> {
        let mut best_h = self.height;
        let mut best_w = self.width;
        let mut best: Option<(usize, i32, i32)> = None;

        // Bottom-left heuristic: the lowest resulting top wins, ties go to
        // the narrowest segment so wide flat spans stay available.
        for i in 0..self.segments.len() {
            if let Some(y) = self.fit(i, w, h) {
                let seg = self.segments[i];
                if y + h < best_h || (y + h == best_h && seg.width < best_w) {
                    best = Some((i, seg.x, y));
                    best_w = seg.width;
                    best_h = y + h;
                }
            }
        }

        let (idx, x, y) = best?;
        self.raise(idx, x, y, w, h);
        Some((x, y))
    }

    /// Resting height for a `w`×`h` rectangle dropped at segment `idx`, or
    /// `None` if it would stick out of the atlas.
    fn fit(&self, idx: usize, w: i32, h: i32) -> Option<i32> {
        let x = self.segments[idx].x;
        if x + w > self.width {
            return None;
        }

        let mut y = self.segments[idx].y;
        let mut space_left = w;
        let mut i = idx;
        while space_left > 0 {
            if i == self.segments.len() {
                return None;
            }
            y = y.max(self.segments[i].y);
            if y + h > self.height {
                return None;
            }
            space_left -= self.segments[i].width;
            i += 1;
        }
        Some(y)
    }

    /// Commit a placement: insert the new top segment, consume what it
    /// shadows, and merge equal-height neighbors.
    fn raise(&mut self, idx: usize, x: i32, y: i32, w: i32, h: i32) {
        self.segments.insert(idx, Segment { x, y: y + h, width: w });

        // Segments to the right that fall under the new span get trimmed at
        // their left edge or swallowed whole.
        let mut i = idx + 1;
        while i < self.segments.len() {
            let prev_end = self.segments[i - 1].x + self.segments[i - 1].width;
            if self.segments[i].x >= prev_end {
                break;
            }
            let shrink = prev_end - self.segments[i].x;
            self.segments[i].x += shrink;
            self.segments[i].width -= shrink;
            if self.segments[i].width <= 0 {
                self.segments.remove(i);
            } else {
                break;
            }
        }

        // Merge adjacent segments at equal height to bound the segment
        // count.
        let mut i = 0;
        while i + 1 < self.segments.len() {
            if self.segments[i].y == self.segments[i + 1].y {
                self.segments[i].width += self.segments[i + 1].width;
                self.segments.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn overlaps(a: (i32, i32, i32, i32), b: (i32, i32, i32, i32)) -> bool {
        a.0 < b.0 + b.2 && b.0 < a.0 + a.2 && a.1 < b.1 + b.3 && b.1 < a.1 + a.3
    }

    #[test]
    fn first_rect_lands_at_origin() {
        let mut atlas = SkylineAtlas::new(256, 256);
        assert_eq!(atlas.add_rect(10, 10), Some((0, 0)));
    }

    #[test]
    fn packs_along_the_bottom() {
        let mut atlas = SkylineAtlas::new(256, 256);
        assert_eq!(atlas.add_rect(10, 10), Some((0, 0)));
        // Same height: the second rect goes right next to the first.
        assert_eq!(atlas.add_rect(10, 10), Some((10, 0)));
        assert_eq!(atlas.add_rect(10, 10), Some((20, 0)));
    }

    #[test]
    fn rejects_oversized_rects() {
        let mut atlas = SkylineAtlas::new(64, 64);
        assert_eq!(atlas.add_rect(65, 1), None);
        assert_eq!(atlas.add_rect(1, 65), None);
    }

    #[test]
    fn full_then_smaller_fits() {
        let mut atlas = SkylineAtlas::new(32, 32);
        assert_eq!(atlas.add_rect(32, 24), Some((0, 0)));
        // Nothing taller than 8 rows is left.
        assert_eq!(atlas.add_rect(16, 16), None);
        // A shorter rect still fits without any compaction in between.
        assert_eq!(atlas.add_rect(16, 8), Some((0, 24)));
    }

    #[test]
    fn placements_never_overlap() {
        let mut atlas = SkylineAtlas::new(512, 512);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut placed = Vec::new();

        for _ in 0..300 {
            let w = rng.random_range(2..48);
            let h = rng.random_range(2..48);
            if let Some((x, y)) = atlas.add_rect(w, h) {
                assert!(x >= 0 && y >= 0 && x + w <= 512 && y + h <= 512);
                placed.push((x, y, w, h));
            }
        }

        assert!(!placed.is_empty());
        for i in 0..placed.len() {
            for j in i + 1..placed.len() {
                assert!(
                    !overlaps(placed[i], placed[j]),
                    "{:?} overlaps {:?}",
                    placed[i],
                    placed[j]
                );
            }
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let sizes: Vec<(i32, i32)> = {
            let mut rng = StdRng::seed_from_u64(7);
            (0..200)
                .map(|_| (rng.random_range(1..40), rng.random_range(1..40)))
                .collect()
        };

        let mut a = SkylineAtlas::new(256, 256);
        let first: Vec<_> = sizes.iter().map(|&(w, h)| a.add_rect(w, h)).collect();

        a.reset(256, 256);
        let second: Vec<_> = sizes.iter().map(|&(w, h)| a.add_rect(w, h)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn expand_keeps_placements_and_adds_width() {
        let mut atlas = SkylineAtlas::new(32, 32);
        assert_eq!(atlas.add_rect(32, 32), Some((0, 0)));
        assert_eq!(atlas.add_rect(8, 8), None);

        atlas.expand(64, 64);
        // New space opens at the old right edge, old placement untouched.
        assert_eq!(atlas.add_rect(8, 8), Some((32, 0)));
        assert_eq!(atlas.max_y(), 32);
    }

    #[test]
    fn reset_behaves_like_fresh() {
        let mut atlas = SkylineAtlas::new(128, 128);
        atlas.add_rect(100, 100);
        atlas.reset(128, 128);
        assert_eq!(atlas.add_rect(100, 100), Some((0, 0)));
        assert_eq!(atlas.max_y(), 100);
    }
}
