//! Named pixel transforms for `modify` nodes.
//!
//! Each modifier declares a stable tag and a version. Both go into the node
//! descriptor, so bumping the version of a modifier invalidates every cached
//! realization that used it, on any machine.

use image::{imageops, Rgba, RgbaImage};
use serde_json::{json, Value};

use super::Rect;

/// Colour that marks glyph-spacing dots in font source images.
pub const FONT_DOT_SOURCE: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Colour the dots are rewritten to.
pub const FONT_DOT_OUTPUT: Rgba<u8> = Rgba([255, 0, 255, 255]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    /// Mirror left-to-right.
    FlipH,
    /// Font palette rewrite: the background colour (top-left pixel) becomes
    /// transparent, dot markers a distinct colour, glyph pixels opaque white.
    FontPalette,
    /// Make a rectangle fully transparent.
    ClearRect(Rect),
}

impl Modifier {
    pub fn tag(&self) -> &'static str {
        match self {
            Modifier::FlipH => "flip-h",
            Modifier::FontPalette => "font-palette",
            Modifier::ClearRect(_) => "clear-rect",
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Modifier::FlipH => 1,
            Modifier::FontPalette => 1,
            Modifier::ClearRect(_) => 1,
        }
    }

    pub(crate) fn params(&self) -> Value {
        match self {
            Modifier::FlipH | Modifier::FontPalette => Value::Null,
            Modifier::ClearRect(r) => json!([r.x, r.y, r.w, r.h]),
        }
    }

    /// Declared output size for an input of `size`.
    pub fn output_size(&self, size: (u32, u32)) -> (u32, u32) {
        size
    }

    pub fn apply(&self, input: &RgbaImage) -> RgbaImage {
        match self {
            Modifier::FlipH => imageops::flip_horizontal(input),
            Modifier::FontPalette => rewrite_font_palette(input),
            Modifier::ClearRect(rect) => {
                let mut out = input.clone();
                for y in rect.y..rect.bottom().min(out.height()) {
                    for x in rect.x..rect.right().min(out.width()) {
                        out.put_pixel(x, y, Rgba([0, 0, 0, 0]));
                    }
                }
                out
            }
        }
    }
}

fn rewrite_font_palette(input: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(input.width(), input.height());
    if input.width() == 0 || input.height() == 0 {
        return out;
    }
    let background = *input.get_pixel(0, 0);
    for (x, y, px) in input.enumerate_pixels() {
        let mapped = if *px == background {
            Rgba([0, 0, 0, 0])
        } else if *px == FONT_DOT_SOURCE {
            FONT_DOT_OUTPUT
        } else {
            Rgba([255, 255, 255, 255])
        };
        out.put_pixel(x, y, mapped);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_h() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([9, 9, 9, 255]));
        let out = Modifier::FlipH.apply(&img);
        assert_eq!(out.get_pixel(1, 0).0, [9, 9, 9, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_font_palette() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, FONT_DOT_SOURCE);
        img.put_pixel(2, 0, Rgba([0, 0, 0, 255]));
        let out = Modifier::FontPalette.apply(&img);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(*out.get_pixel(1, 0), FONT_DOT_OUTPUT);
        assert_eq!(out.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_clear_rect() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255]));
        let out = Modifier::ClearRect(Rect::new(1, 1, 2, 2)).apply(&img);
        assert_eq!(out.get_pixel(1, 1).0[3], 0);
        assert_eq!(out.get_pixel(2, 2).0[3], 0);
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
        assert_eq!(out.get_pixel(3, 3).0[3], 255);
    }
}
