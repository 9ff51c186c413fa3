//! Sheet compositing.
//!
//! Tile and item sheets are fixed grids addressed by ID. Structure and
//! static-animation sheets are pages filled by the box packer.

use image::{imageops, RgbaImage};

use crate::error::{GenError, Result};

/// Side of a grid sheet or packed page, in pixels.
pub const SHEET_PX: u32 = 1024;

/// Cell of `index` on a grid of `cell`-pixel cells, in cells.
pub fn grid_position(index: u32, cell: u32) -> (u32, u32) {
    let cols = SHEET_PX / cell;
    (index % cols, index / cols)
}

/// Composite `images` onto a grid, one per `cell`-pixel cell in index
/// order. Smaller images sit in the top-left corner of their cell. The sheet
/// is one page wide and as tall as its last used row.
pub fn compose_grid(images: &[&RgbaImage], cell: u32) -> Result<RgbaImage> {
    let cols = SHEET_PX / cell;
    let rows = (images.len() as u32).div_ceil(cols).max(1);
    if rows * cell > SHEET_PX {
        return Err(GenError::OversizedBox {
            width: cols,
            height: rows,
            page_width: cols,
            page_height: SHEET_PX / cell,
        });
    }
    let mut sheet = RgbaImage::new(SHEET_PX, rows * cell);
    for (i, img) in images.iter().enumerate() {
        let (cx, cy) = grid_position(i as u32, cell);
        blit(&mut sheet, img, (cx * cell, cy * cell));
    }
    Ok(sheet)
}

/// A packed page under construction.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub image: RgbaImage,
    used_height: u32,
}

impl PageImage {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(SHEET_PX, SHEET_PX),
            used_height: 0,
        }
    }

    pub fn blit(&mut self, img: &RgbaImage, pos: (u32, u32)) {
        blit(&mut self.image, img, pos);
        self.used_height = self.used_height.max(pos.1 + img.height());
    }

    /// The page cropped to its used rows, rounded up to `cell`.
    pub fn finish(self, cell: u32) -> RgbaImage {
        let height = self.used_height.div_ceil(cell).max(1) * cell;
        if height >= self.image.height() {
            return self.image;
        }
        imageops::crop_imm(&self.image, 0, 0, SHEET_PX, height).to_image()
    }
}

impl Default for PageImage {
    fn default() -> Self {
        Self::new()
    }
}

fn blit(sheet: &mut RgbaImage, img: &RgbaImage, pos: (u32, u32)) {
    imageops::replace(sheet, img, pos.0 as i64, pos.1 as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(side: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(side, side, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_grid_position() {
        assert_eq!(grid_position(0, 32), (0, 0));
        assert_eq!(grid_position(33, 32), (1, 1));
        assert_eq!(grid_position(31, 32), (31, 0));
    }

    #[test]
    fn test_compose_grid() {
        let a = solid(32, 10);
        let b = solid(16, 20);
        let sheet = compose_grid(&[&a, &b], 32).unwrap();
        assert_eq!(sheet.dimensions(), (1024, 32));
        assert_eq!(sheet.get_pixel(0, 0).0[0], 10);
        assert_eq!(sheet.get_pixel(32, 0).0[0], 20);
        // small icons stay in the top-left of their cell
        assert_eq!(sheet.get_pixel(32 + 20, 20).0[3], 0);
    }

    #[test]
    fn test_grid_height_limited_to_one_page() {
        let a = solid(32, 1);
        let many: Vec<&RgbaImage> = (0..32 * 32 + 1).map(|_| &a).collect();
        assert!(compose_grid(&many, 32).is_err());
        assert!(compose_grid(&many[..32 * 32], 32).is_ok());
    }

    #[test]
    fn test_page_finish_trims() {
        let mut page = PageImage::new();
        page.blit(&solid(32, 5), (64, 40));
        let img = page.finish(32);
        assert_eq!(img.dimensions(), (1024, 96));
    }
}
