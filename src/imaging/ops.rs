//! Unit-aware image operations.
//!
//! Positions and sizes are given in units; `None` means the node's own unit.
//! Each operation lowers to one of the primitive nodes.

use std::collections::BTreeMap;

use crate::error::{GenError, Result};

use super::cache::ImageCache;
use super::modifier::Modifier;
use super::node::{ImageNode, Resample};
use super::Rect;

impl ImageNode {
    fn resolve_unit(&self, unit: Option<(u32, u32)>) -> (u32, u32) {
        unit.unwrap_or_else(|| self.unit())
    }

    /// Crop `size` units starting at `pos` units.
    pub fn extract(
        &self,
        pos: (u32, u32),
        size: (u32, u32),
        unit: Option<(u32, u32)>,
    ) -> Result<ImageNode> {
        let (ux, uy) = self.resolve_unit(unit);
        let rect = Rect::new(pos.0 * ux, pos.1 * uy, size.0 * ux, size.1 * uy);
        self.crop(rect)?.with_unit((ux, uy))
    }

    /// One-unit extracts for each named position.
    pub fn chop(
        &self,
        positions: &BTreeMap<String, (u32, u32)>,
        unit: Option<(u32, u32)>,
    ) -> Result<BTreeMap<String, ImageNode>> {
        positions
            .iter()
            .map(|(name, &pos)| Ok((name.clone(), self.extract(pos, (1, 1), unit)?)))
            .collect()
    }

    /// Resample to `size` units. Smooth scaling uses bicubic when enlarging
    /// and antialiasing when shrinking; otherwise nearest-neighbour.
    pub fn scale(&self, size: (u32, u32), unit: Option<(u32, u32)>, smooth: bool) -> Result<ImageNode> {
        let (ux, uy) = self.resolve_unit(unit);
        let (w, h) = (size.0 * ux, size.1 * uy);
        if w == 0 || h == 0 {
            return Err(GenError::eval("scale to an empty size"));
        }
        let mode = if !smooth {
            Resample::Nearest
        } else if w >= self.width() && h >= self.height() {
            Resample::Bicubic
        } else {
            Resample::Antialias
        };
        self.resize(w, h, mode).with_unit((ux, uy))
    }

    /// Place onto a transparent canvas of `size` units. The offset defaults
    /// to centring (rounded down).
    pub fn pad(
        &self,
        size: (u32, u32),
        offset: Option<(u32, u32)>,
        unit: Option<(u32, u32)>,
    ) -> Result<ImageNode> {
        let (ux, uy) = self.resolve_unit(unit);
        let (w, h) = (size.0 * ux, size.1 * uy);
        let offset = match offset {
            Some((ox, oy)) => (ox * ux, oy * uy),
            None => (
                w.saturating_sub(self.width()) / 2,
                h.saturating_sub(self.height()) / 2,
            ),
        };
        self.pad_pixels(w, h, offset)?.with_unit((ux, uy))
    }

    pub fn flip(&self) -> ImageNode {
        self.modify(Modifier::FlipH)
    }

    /// Crop to the bounding box of non-transparent pixels. Returns the
    /// cropped image and where its origin sat in this one. A fully
    /// transparent image crops to 0×0 at the origin.
    pub fn autocrop(&self, cache: &mut ImageCache) -> Result<(ImageNode, (u32, u32))> {
        match cache.bbox(self)? {
            Some(rect) => Ok((self.crop(rect)?, (rect.x, rect.y))),
            None => Ok((self.crop(Rect::new(0, 0, 0, 0))?, (0, 0))),
        }
    }

    /// Fit into a square as large as the longest side, then resample to
    /// `side`×`side` pixels.
    pub fn square_thumbnail(&self, side: u32) -> Result<ImageNode> {
        let max = self.width().max(self.height()).max(1);
        let square = self.pad_pixels(
            max,
            max,
            ((max - self.width()) / 2, (max - self.height()) / 2),
        )?;
        let mode = if max >= side {
            Resample::Antialias
        } else {
            Resample::Bicubic
        };
        Ok(square.resize(side, side, mode))
    }
}
