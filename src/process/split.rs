//! Static/animated split for animated structure parts.
//!
//! Pixels that never change across frames form the static base image. The
//! tight box around every pixel that does change is cut out of each frame
//! into a filmstrip.

use image::RgbaImage;

use crate::error::Result;
use crate::imaging::{Anim, ImageCache, ImageNode, Modifier, Rect};

/// Tight box of pixels that differ from the first frame in any frame.
pub fn changed_region(frames: &[&RgbaImage]) -> Option<Rect> {
    let (first, rest) = frames.split_first()?;
    let mut region: Option<Rect> = None;
    for frame in rest {
        for (x, y, px) in frame.enumerate_pixels() {
            if first.get_pixel(x, y) != px {
                let r = Rect::new(x, y, 1, 1);
                region = Some(region.map_or(r, |cur| cur.union(&r)));
            }
        }
    }
    region
}

/// Result of splitting an animation.
#[derive(Debug, Clone)]
pub struct Split {
    /// First frame with the animated box cleared.
    pub base: ImageNode,
    /// Frames cropped to the animated box; `None` when nothing changes.
    pub anim: Option<(Rect, Anim)>,
}

pub fn split_anim(anim: &Anim, cache: &mut ImageCache) -> Result<Split> {
    let realized = anim
        .frames()
        .iter()
        .map(|f| cache.realize(f))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&RgbaImage> = realized.iter().map(|img| img.as_ref()).collect();
    let Some(rect) = changed_region(&refs) else {
        return Ok(Split {
            base: anim.first().clone(),
            anim: None,
        });
    };
    let base = anim.first().modify(Modifier::ClearRect(rect));
    let cropped = anim.map(|frame| frame.crop(rect))?;
    Ok(Split {
        base,
        anim: Some((rect, cropped)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn frame(flame: u8) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(32, 32, Rgba([50, 50, 50, 255]));
        img.put_pixel(10, 4, Rgba([flame, 0, 0, 255]));
        img.put_pixel(12, 6, Rgba([0, flame, 0, 255]));
        img
    }

    #[test]
    fn test_changed_region() {
        let (a, b, c) = (frame(1), frame(2), frame(1));
        assert_eq!(changed_region(&[&a, &b, &c]), Some(Rect::new(10, 4, 3, 3)));
        assert_eq!(changed_region(&[&a, &c]), None);
        assert_eq!(changed_region(&[]), None);
    }

    #[test]
    fn test_split_anim() {
        let frames = vec![
            ImageNode::from_pixels(frame(100)),
            ImageNode::from_pixels(frame(200)),
        ];
        let anim = Anim::new(frames, 4, false).unwrap();
        let mut cache = ImageCache::new();
        let split = split_anim(&anim, &mut cache).unwrap();

        let (rect, strip) = split.anim.unwrap();
        assert_eq!(rect, Rect::new(10, 4, 3, 3));
        assert_eq!(strip.frame_size(), (3, 3));
        assert_eq!(strip.len(), 2);

        let base = cache.realize(&split.base).unwrap();
        assert_eq!(base.get_pixel(10, 4).0[3], 0);
        assert_eq!(base.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_still_anim_has_no_strip() {
        let frames = vec![ImageNode::from_pixels(frame(9)), ImageNode::from_pixels(frame(9))];
        let anim = Anim::new(frames, 4, false).unwrap();
        let split = split_anim(&anim, &mut ImageCache::new()).unwrap();
        assert!(split.anim.is_none());
    }
}
