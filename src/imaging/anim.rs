//! Animations: ordered frames of identical size.

use crate::error::{GenError, Result};

use super::node::ImageNode;

#[derive(Debug, Clone, PartialEq)]
pub struct Anim {
    frames: Vec<ImageNode>,
    /// Frames per second.
    pub rate: u32,
    pub oneshot: bool,
}

impl Anim {
    /// All frames must share size and unit.
    pub fn new(frames: Vec<ImageNode>, rate: u32, oneshot: bool) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| GenError::eval("animation with no frames"))?;
        if let Some(bad) = frames
            .iter()
            .find(|f| f.size() != first.size() || f.unit() != first.unit())
        {
            return Err(GenError::eval(format!(
                "animation frame {:?} does not match first frame {:?}",
                bad.size(),
                first.size()
            )));
        }
        Ok(Self {
            frames,
            rate,
            oneshot,
        })
    }

    /// Split a horizontal filmstrip into `count` equal frames.
    pub fn from_strip(strip: &ImageNode, count: u32, rate: u32, oneshot: bool) -> Result<Self> {
        if count == 0 || strip.width() % count != 0 {
            return Err(GenError::eval(format!(
                "{}px wide strip cannot be split into {} frames",
                strip.width(),
                count
            )));
        }
        let frame_w = strip.width() / count;
        let frames = (0..count)
            .map(|i| strip.extract((i * frame_w, 0), (frame_w, strip.height()), Some((1, 1))))
            .collect::<Result<Vec<_>>>()?;
        Self::new(frames, rate, oneshot)
    }

    pub fn frames(&self) -> &[ImageNode] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.frames[0].size()
    }

    pub fn first(&self) -> &ImageNode {
        &self.frames[0]
    }

    /// Apply `f` to every frame, checking the results stay uniform.
    pub fn map<F>(&self, f: F) -> Result<Anim>
    where
        F: Fn(&ImageNode) -> Result<ImageNode>,
    {
        let frames = self.frames.iter().map(f).collect::<Result<Vec<_>>>()?;
        Anim::new(frames, self.rate, self.oneshot)
    }

    /// Lay the frames out left to right as one image.
    pub fn flatten(&self) -> Result<ImageNode> {
        let (w, h) = self.frame_size();
        let n = self.frames.len() as u32;
        let placed = self
            .frames
            .iter()
            .enumerate()
            .map(|(i, frame)| frame.pad_pixels(w * n, h, (i as u32 * w, 0)))
            .collect::<Result<Vec<_>>>()?;
        ImageNode::stack(&placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageCache;

    #[test]
    fn test_rejects_mixed_sizes() {
        let frames = vec![ImageNode::blank(32, 32), ImageNode::blank(16, 16)];
        assert!(Anim::new(frames, 10, false).is_err());
    }

    #[test]
    fn test_strip_round_trip() {
        let strip = ImageNode::blank(96, 32);
        let anim = Anim::from_strip(&strip, 3, 8, false).unwrap();
        assert_eq!(anim.len(), 3);
        assert_eq!(anim.frame_size(), (32, 32));

        let flat = anim.flatten().unwrap();
        assert_eq!(flat.size(), (96, 32));
        let mut cache = ImageCache::new();
        assert_eq!(cache.realize(&flat).unwrap().dimensions(), (96, 32));
    }

    #[test]
    fn test_strip_not_divisible() {
        assert!(Anim::from_strip(&ImageNode::blank(100, 32), 3, 8, false).is_err());
    }

    #[test]
    fn test_map_scales_all_frames() {
        let anim = Anim::from_strip(&ImageNode::blank(64, 32), 2, 4, true).unwrap();
        let scaled = anim.map(|f| f.scale((16, 16), Some((1, 1)), false)).unwrap();
        assert_eq!(scaled.frame_size(), (16, 16));
        assert!(scaled.oneshot);
    }
}
