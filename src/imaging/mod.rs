//! Image-op graph.
//!
//! Every image manipulation builds a fresh immutable [`ImageNode`]; nothing
//! mutates its input. Pixels are produced lazily by [`ImageCache::realize`]
//! and memoized by the node's structural descriptor, both in memory and in
//! an on-disk cache that survives between runs.
//!
//! ```ignore
//! let grass = cache.load_file(&path)?;
//! let icon = grass.extract((0, 0), (1, 1), Some((32, 32)))?.scale((16, 16), None, true)?;
//! let pixels = cache.realize(&icon)?;
//! ```

mod anim;
mod cache;
mod modifier;
mod node;
mod ops;

use serde::{Deserialize, Serialize};

pub use anim::Anim;
pub use cache::{CacheStats, ComputeFn, ComputeValue, ImageCache};
pub use modifier::Modifier;
pub use node::{CacheKey, ImageNode, OpTag, Resample};

/// Side of a tile in pixels.
pub const TILE_SIZE: u32 = 32;

/// A pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection of two rectangles, or `None` when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 4, 4)), None);
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(2, 2, 2, 2);
        let b = Rect::new(6, 0, 1, 1);
        assert_eq!(a.union(&b), Rect::new(2, 0, 5, 4));
        assert_eq!(Rect::new(0, 0, 0, 0).union(&b), b);
    }
}
