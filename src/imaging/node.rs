//! Immutable image-graph nodes and their structural descriptors.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::{GenError, Result};

use super::modifier::Modifier;
use super::Rect;

/// SHA-256 of a node's structural descriptor.
///
/// Equal keys mean equal pixels by construction: the descriptor covers the
/// operation, its parameters, and (recursively) the keys of its inputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(pub [u8; 32]);

impl CacheKey {
    fn digest(text: &str) -> Self {
        let hash = Sha256::digest(text.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        CacheKey(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex_string(&self.0)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Resampling used by `resize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resample {
    Nearest,
    Bicubic,
    Antialias,
}

impl Resample {
    fn name(self) -> &'static str {
        match self {
            Resample::Nearest => "nearest",
            Resample::Bicubic => "bicubic",
            Resample::Antialias => "antialias",
        }
    }
}

/// Operation tag of a node, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Blank,
    File,
    Const,
    Modify,
    Crop,
    Resize,
    Stack,
    Pad,
}

impl OpTag {
    pub fn name(self) -> &'static str {
        match self {
            OpTag::Blank => "blank",
            OpTag::File => "file",
            OpTag::Const => "const",
            OpTag::Modify => "modify",
            OpTag::Crop => "crop",
            OpTag::Resize => "resize",
            OpTag::Stack => "stack",
            OpTag::Pad => "pad",
        }
    }
}

pub(crate) enum Op {
    Blank,
    File { path: PathBuf, mtime: u128 },
    Const { pixels: Rc<RgbaImage>, hash: String },
    Modify { input: ImageNode, modifier: Modifier },
    Crop { input: ImageNode, rect: Rect },
    Resize { input: ImageNode, mode: Resample },
    Stack { inputs: Vec<ImageNode> },
    Pad { input: ImageNode, offset: (u32, u32) },
}

impl Op {
    fn tag(&self) -> OpTag {
        match self {
            Op::Blank => OpTag::Blank,
            Op::File { .. } => OpTag::File,
            Op::Const { .. } => OpTag::Const,
            Op::Modify { .. } => OpTag::Modify,
            Op::Crop { .. } => OpTag::Crop,
            Op::Resize { .. } => OpTag::Resize,
            Op::Stack { .. } => OpTag::Stack,
            Op::Pad { .. } => OpTag::Pad,
        }
    }

    fn inputs(&self) -> Vec<&ImageNode> {
        match self {
            Op::Blank | Op::File { .. } | Op::Const { .. } => vec![],
            Op::Modify { input, .. }
            | Op::Crop { input, .. }
            | Op::Resize { input, .. }
            | Op::Pad { input, .. } => vec![input],
            Op::Stack { inputs } => inputs.iter().collect(),
        }
    }

    fn params(&self, size: (u32, u32)) -> Value {
        match self {
            Op::Blank => json!({ "size": [size.0, size.1] }),
            Op::File { path, mtime } => json!({
                "path": path.to_string_lossy(),
                "mtime": mtime.to_string(),
            }),
            Op::Const { hash, .. } => json!({ "size": [size.0, size.1], "sha256": hash }),
            Op::Modify { modifier, .. } => json!({
                "func": modifier.tag(),
                "version": modifier.version(),
                "args": modifier.params(),
                "size": [size.0, size.1],
            }),
            Op::Crop { rect, .. } => json!({ "bounds": [rect.x, rect.y, rect.w, rect.h] }),
            Op::Resize { mode, .. } => json!({ "size": [size.0, size.1], "mode": mode.name() }),
            Op::Stack { .. } => Value::Null,
            Op::Pad { offset, .. } => json!({
                "size": [size.0, size.1],
                "offset": [offset.0, offset.1],
            }),
        }
    }
}

pub(crate) struct NodeData {
    pub(crate) op: Op,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) unit: (u32, u32),
    pub(crate) key: CacheKey,
}

/// A node in the image-op graph. Cheap to clone.
#[derive(Clone)]
pub struct ImageNode(pub(crate) Rc<NodeData>);

impl ImageNode {
    fn build(op: Op, width: u32, height: u32, unit: (u32, u32)) -> Self {
        let inputs: Vec<String> = op.inputs().iter().map(|n| n.key().to_hex()).collect();
        let descriptor = format!(
            "{}({})[{}]",
            op.tag().name(),
            op.params((width, height)),
            inputs.join(",")
        );
        let key = CacheKey::digest(&descriptor);
        ImageNode(Rc::new(NodeData {
            op,
            width,
            height,
            unit,
            key,
        }))
    }

    /// Fully transparent image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::build(Op::Blank, width, height, (1, 1))
    }

    /// A file on disk. The descriptor includes the file's mtime, so edits
    /// invalidate cached realizations.
    pub(crate) fn file(path: &Path, width: u32, height: u32, mtime: u128) -> Self {
        Self::build(
            Op::File {
                path: path.to_path_buf(),
                mtime,
            },
            width,
            height,
            (1, 1),
        )
    }

    /// Raw pixels produced outside the graph.
    pub fn from_pixels(pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        let mut hasher = Sha256::new();
        hasher.update(width.to_le_bytes());
        hasher.update(height.to_le_bytes());
        hasher.update(pixels.as_raw());
        let hash = hex_string(&hasher.finalize());
        Self::build(
            Op::Const {
                pixels: Rc::new(pixels),
                hash,
            },
            width,
            height,
            (1, 1),
        )
    }

    pub fn modify(&self, modifier: Modifier) -> Self {
        let (w, h) = modifier.output_size(self.size());
        Self::build(
            Op::Modify {
                input: self.clone(),
                modifier,
            },
            w,
            h,
            self.unit(),
        )
    }

    /// Crop to pixel bounds, which must lie inside the image.
    pub fn crop(&self, rect: Rect) -> Result<Self> {
        if rect.right() > self.width() || rect.bottom() > self.height() {
            return Err(GenError::eval(format!(
                "crop {}x{}+{}+{} outside {}x{} image",
                rect.w,
                rect.h,
                rect.x,
                rect.y,
                self.width(),
                self.height()
            )));
        }
        Ok(Self::build(
            Op::Crop {
                input: self.clone(),
                rect,
            },
            rect.w,
            rect.h,
            (1, 1),
        ))
    }

    pub fn resize(&self, width: u32, height: u32, mode: Resample) -> Self {
        if (width, height) == self.size() {
            return self.clone();
        }
        Self::build(
            Op::Resize {
                input: self.clone(),
                mode,
            },
            width,
            height,
            (1, 1),
        )
    }

    /// Alpha-composite `layers` over the first one.
    pub fn stack(layers: &[ImageNode]) -> Result<Self> {
        let first = layers
            .first()
            .ok_or_else(|| GenError::eval("stack of zero layers"))?;
        for layer in &layers[1..] {
            if layer.size() != first.size() || layer.unit() != first.unit() {
                return Err(GenError::eval(format!(
                    "stack layer size {:?} / unit {:?} does not match {:?} / {:?}",
                    layer.size(),
                    layer.unit(),
                    first.size(),
                    first.unit()
                )));
            }
        }
        if layers.len() == 1 {
            return Ok(first.clone());
        }
        Ok(Self::build(
            Op::Stack {
                inputs: layers.to_vec(),
            },
            first.width(),
            first.height(),
            first.unit(),
        ))
    }

    /// Place this image on a transparent canvas of `width`×`height`.
    pub fn pad_pixels(&self, width: u32, height: u32, offset: (u32, u32)) -> Result<Self> {
        if offset.0 + self.width() > width || offset.1 + self.height() > height {
            return Err(GenError::eval(format!(
                "pad: {}x{} image at {:?} does not fit {}x{} canvas",
                self.width(),
                self.height(),
                offset,
                width,
                height
            )));
        }
        Ok(Self::build(
            Op::Pad {
                input: self.clone(),
                offset,
            },
            width,
            height,
            (1, 1),
        ))
    }

    /// Same pixels, different unit. Width and height must be multiples of it.
    pub fn with_unit(&self, unit: (u32, u32)) -> Result<Self> {
        if unit.0 == 0 || unit.1 == 0 || self.width() % unit.0 != 0 || self.height() % unit.1 != 0 {
            return Err(GenError::eval(format!(
                "{}x{} image is not divisible into {}x{} units",
                self.width(),
                self.height(),
                unit.0,
                unit.1
            )));
        }
        let data = &self.0;
        Ok(ImageNode(Rc::new(NodeData {
            op: data.op.shallow_clone(),
            width: data.width,
            height: data.height,
            unit,
            key: data.key,
        })))
    }

    pub fn width(&self) -> u32 {
        self.0.width
    }

    pub fn height(&self) -> u32 {
        self.0.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.0.width, self.0.height)
    }

    pub fn unit(&self) -> (u32, u32) {
        self.0.unit
    }

    /// Size measured in units.
    pub fn unit_size(&self) -> (u32, u32) {
        (self.0.width / self.0.unit.0, self.0.height / self.0.unit.1)
    }

    pub fn key(&self) -> CacheKey {
        self.0.key
    }

    pub fn tag(&self) -> OpTag {
        self.0.op.tag()
    }

    /// Source path for `file` nodes.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.0.op {
            Op::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl Op {
    fn shallow_clone(&self) -> Op {
        match self {
            Op::Blank => Op::Blank,
            Op::File { path, mtime } => Op::File {
                path: path.clone(),
                mtime: *mtime,
            },
            Op::Const { pixels, hash } => Op::Const {
                pixels: Rc::clone(pixels),
                hash: hash.clone(),
            },
            Op::Modify { input, modifier } => Op::Modify {
                input: input.clone(),
                modifier: modifier.clone(),
            },
            Op::Crop { input, rect } => Op::Crop {
                input: input.clone(),
                rect: *rect,
            },
            Op::Resize { input, mode } => Op::Resize {
                input: input.clone(),
                mode: *mode,
            },
            Op::Stack { inputs } => Op::Stack {
                inputs: inputs.clone(),
            },
            Op::Pad { input, offset } => Op::Pad {
                input: input.clone(),
                offset: *offset,
            },
        }
    }
}

impl PartialEq for ImageNode {
    fn eq(&self, other: &Self) -> bool {
        self.0.key == other.0.key && self.0.unit == other.0.unit
    }
}

impl Eq for ImageNode {}

impl Hash for ImageNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key.hash(state);
    }
}

impl fmt::Debug for ImageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImageNode({} {}x{} unit {:?} {:?})",
            self.tag().name(),
            self.width(),
            self.height(),
            self.unit(),
            self.key()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_structure_equal_key() {
        let a = ImageNode::blank(32, 32).pad_pixels(64, 32, (0, 0)).unwrap();
        let b = ImageNode::blank(32, 32).pad_pixels(64, 32, (0, 0)).unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_params_change_key() {
        let base = ImageNode::blank(64, 64);
        let a = base.crop(Rect::new(0, 0, 32, 32)).unwrap();
        let b = base.crop(Rect::new(32, 0, 32, 32)).unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_file_mtime_changes_key() {
        let path = Path::new("assets/grass.png");
        let a = ImageNode::file(path, 32, 32, 1);
        let b = ImageNode::file(path, 32, 32, 2);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_const_hashes_pixels() {
        let mut pixels = RgbaImage::new(2, 2);
        let a = ImageNode::from_pixels(pixels.clone());
        pixels.put_pixel(1, 1, image::Rgba([1, 2, 3, 4]));
        let b = ImageNode::from_pixels(pixels);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.tag(), OpTag::Const);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let base = ImageNode::blank(32, 32);
        assert!(base.crop(Rect::new(16, 0, 32, 32)).is_err());
    }

    #[test]
    fn test_stack_size_mismatch() {
        let a = ImageNode::blank(32, 32);
        let b = ImageNode::blank(16, 16);
        assert!(ImageNode::stack(&[a, b]).is_err());
    }

    #[test]
    fn test_with_unit_divisibility() {
        let base = ImageNode::blank(64, 32);
        let unit = base.with_unit((32, 32)).unwrap();
        assert_eq!(unit.unit_size(), (2, 1));
        assert_eq!(unit.key(), base.key());
        assert!(base.with_unit((24, 32)).is_err());
    }
}
