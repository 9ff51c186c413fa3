//! Two-tier realization cache.
//!
//! The in-memory tier maps descriptor keys to realized pixel buffers. The
//! on-disk tier is loaded once at pipeline start and written once at the
//! end; only entries touched during the run are written back, so nodes that
//! no final product reaches drop out of the cache file.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{GenError, Result};

use super::node::{hex_string, CacheKey, ImageNode, Op, Resample};
use super::Rect;

const CACHE_VERSION: u32 = 1;

/// Host functions whose results are memoized per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeFn {
    /// SHA-256 over dimensions and RGBA bytes.
    ContentHash,
    /// Bounding box of pixels with non-zero alpha.
    Bbox,
}

impl ComputeFn {
    /// Stable identity used in the memo key. Bump the suffix when the
    /// function's behaviour changes.
    pub fn identity(self) -> &'static str {
        match self {
            ComputeFn::ContentHash => "content-hash@1",
            ComputeFn::Bbox => "bbox@1",
        }
    }

    fn run(self, img: &RgbaImage) -> ComputeValue {
        match self {
            ComputeFn::ContentHash => ComputeValue::Hash(pixel_hash(img)),
            ComputeFn::Bbox => ComputeValue::Bbox(alpha_bbox(img)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeValue {
    Hash(String),
    Bbox(Option<Rect>),
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: usize,
    pub disk_hits: usize,
    pub realized: usize,
    pub compute_hits: usize,
    pub computed: usize,
}

#[derive(Serialize, Deserialize)]
struct StoredImage {
    key: CacheKey,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StoredCompute {
    key: CacheKey,
    func: String,
    value: ComputeValue,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    images: Vec<StoredImage>,
    computed: Vec<StoredCompute>,
}

#[derive(Default)]
pub struct ImageCache {
    memory: HashMap<CacheKey, Rc<RgbaImage>>,
    disk: HashMap<CacheKey, StoredImage>,
    computed: HashMap<(CacheKey, String), ComputeValue>,
    disk_computed: HashMap<(CacheKey, String), ComputeValue>,
    files: HashMap<PathBuf, ImageNode>,
    used_assets: BTreeSet<PathBuf>,
    stats: CacheStats,
}

impl ImageCache {
    /// An empty cache with no on-disk tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the on-disk tier from `path`. A missing file gives an empty
    /// cache; an unreadable one is discarded with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cache = Self::new();
        if !path.exists() {
            return Ok(cache);
        }
        let bytes = fs::read(path).map_err(|e| GenError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read image cache: {}", e),
        })?;
        let decoded: std::result::Result<(CacheFile, usize), _> =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard());
        match decoded {
            Ok((file, _)) if file.version == CACHE_VERSION => {
                debug!(
                    images = file.images.len(),
                    computed = file.computed.len(),
                    "loaded image cache"
                );
                for stored in file.images {
                    cache.disk.insert(stored.key, stored);
                }
                for stored in file.computed {
                    cache
                        .disk_computed
                        .insert((stored.key, stored.func), stored.value);
                }
            }
            Ok((file, _)) => {
                warn!(found = file.version, "ignoring image cache with old version");
            }
            Err(e) => {
                warn!("ignoring unreadable image cache {}: {}", path.display(), e);
            }
        }
        Ok(cache)
    }

    /// Write every entry touched during this run to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut images: Vec<StoredImage> = self
            .memory
            .iter()
            .map(|(key, img)| StoredImage {
                key: *key,
                width: img.width(),
                height: img.height(),
                rgba: img.as_raw().clone(),
            })
            .collect();
        images.sort_by_key(|s| s.key);

        let mut computed: Vec<StoredCompute> = self
            .computed
            .iter()
            .map(|((key, func), value)| StoredCompute {
                key: *key,
                func: func.clone(),
                value: value.clone(),
            })
            .collect();
        computed.sort_by(|a, b| (a.key, &a.func).cmp(&(b.key, &b.func)));

        let file = CacheFile {
            version: CACHE_VERSION,
            images,
            computed,
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .map_err(|e| GenError::Cache {
                message: format!("Failed to encode image cache: {}", e),
            })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes).map_err(|e| GenError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to write image cache: {}", e),
        })?;
        Ok(())
    }

    /// A `file` node for `path`. One node per unique path per run.
    pub fn load_file(&mut self, path: &Path) -> Result<ImageNode> {
        if let Some(node) = self.files.get(path) {
            return Ok(node.clone());
        }
        let meta = fs::metadata(path).map_err(|e| GenError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        let (width, height) = image::image_dimensions(path).map_err(|e| GenError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let node = ImageNode::file(path, width, height, mtime);
        self.used_assets.insert(path.to_path_buf());
        self.files.insert(path.to_path_buf(), node.clone());
        Ok(node)
    }

    /// Files opened during this run, sorted.
    pub fn used_assets(&self) -> impl Iterator<Item = &Path> {
        self.used_assets.iter().map(|p| p.as_path())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether a realization for `node` is available without computing it.
    pub fn is_cached(&self, node: &ImageNode) -> bool {
        let key = node.key();
        self.memory.contains_key(&key) || self.disk.contains_key(&key)
    }

    /// Pixels for `node`, realizing inputs as needed.
    pub fn realize(&mut self, node: &ImageNode) -> Result<Rc<RgbaImage>> {
        let key = node.key();
        if let Some(img) = self.memory.get(&key) {
            self.stats.memory_hits += 1;
            return Ok(Rc::clone(img));
        }
        if let Some(stored) = self.disk.remove(&key) {
            if let Some(img) = RgbaImage::from_raw(stored.width, stored.height, stored.rgba) {
                self.stats.disk_hits += 1;
                let img = Rc::new(img);
                self.memory.insert(key, Rc::clone(&img));
                return Ok(img);
            }
            warn!(%key, "discarding malformed cache entry");
        }

        let img = Rc::new(self.compute_pixels(node)?);
        self.stats.realized += 1;
        self.memory.insert(key, Rc::clone(&img));
        Ok(img)
    }

    fn compute_pixels(&mut self, node: &ImageNode) -> Result<RgbaImage> {
        let (width, height) = node.size();
        let img = match &node.0.op {
            Op::Blank => RgbaImage::new(width, height),
            Op::File { path, .. } => image::open(path)
                .map_err(|e| GenError::Image {
                    path: path.clone(),
                    message: e.to_string(),
                })?
                .to_rgba8(),
            Op::Const { pixels, .. } => (**pixels).clone(),
            Op::Modify { input, modifier } => {
                let src = self.realize(input)?;
                modifier.apply(&src)
            }
            Op::Crop { input, rect } => {
                let src = self.realize(input)?;
                imageops::crop_imm(&*src, rect.x, rect.y, rect.w, rect.h).to_image()
            }
            Op::Resize { input, mode } => {
                let src = self.realize(input)?;
                let filter = match mode {
                    Resample::Nearest => imageops::FilterType::Nearest,
                    Resample::Bicubic => imageops::FilterType::CatmullRom,
                    Resample::Antialias => imageops::FilterType::Lanczos3,
                };
                imageops::resize(&*src, width, height, filter)
            }
            Op::Stack { inputs } => {
                let mut base = (*self.realize(&inputs[0])?).clone();
                for layer in &inputs[1..] {
                    let top = self.realize(layer)?;
                    imageops::overlay(&mut base, &*top, 0, 0);
                }
                base
            }
            Op::Pad { input, offset } => {
                let src = self.realize(input)?;
                let mut canvas = RgbaImage::new(width, height);
                imageops::replace(&mut canvas, &*src, offset.0 as i64, offset.1 as i64);
                canvas
            }
        };
        if img.dimensions() != (width, height) {
            return Err(GenError::Image {
                path: node.source_path().map(Path::to_path_buf).unwrap_or_default(),
                message: format!(
                    "realized {}x{} pixels for a node declared {}x{}",
                    img.width(),
                    img.height(),
                    width,
                    height
                ),
            });
        }
        Ok(img)
    }

    /// Evaluate `func` on the realized node, memoized by
    /// `(node descriptor, function identity)`.
    pub fn compute(&mut self, node: &ImageNode, func: ComputeFn) -> Result<ComputeValue> {
        let memo_key = (node.key(), func.identity().to_string());
        if let Some(value) = self.computed.get(&memo_key) {
            self.stats.compute_hits += 1;
            return Ok(value.clone());
        }
        if let Some(value) = self.disk_computed.remove(&memo_key) {
            self.stats.compute_hits += 1;
            self.computed.insert(memo_key, value.clone());
            return Ok(value);
        }
        let img = self.realize(node)?;
        let value = func.run(&img);
        self.stats.computed += 1;
        self.computed.insert(memo_key, value.clone());
        Ok(value)
    }

    pub fn content_hash(&mut self, node: &ImageNode) -> Result<String> {
        match self.compute(node, ComputeFn::ContentHash)? {
            ComputeValue::Hash(h) => Ok(h),
            other => Err(GenError::Cache {
                message: format!("content-hash memo holds {:?}", other),
            }),
        }
    }

    pub fn bbox(&mut self, node: &ImageNode) -> Result<Option<Rect>> {
        match self.compute(node, ComputeFn::Bbox)? {
            ComputeValue::Bbox(b) => Ok(b),
            other => Err(GenError::Cache {
                message: format!("bbox memo holds {:?}", other),
            }),
        }
    }
}

fn pixel_hash(img: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_le_bytes());
    hasher.update(img.height().to_le_bytes());
    hasher.update(img.as_raw());
    hex_string(&hasher.finalize())
}

/// Bounding box of non-transparent pixels.
pub(crate) fn alpha_bbox(img: &RgbaImage) -> Option<Rect> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if px.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    use crate::imaging::Modifier;

    fn write_fixture(path: &Path) {
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(1, 2, Rgba([200, 10, 10, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_realize_blank() {
        let mut cache = ImageCache::new();
        let img = cache.realize(&ImageNode::blank(8, 4)).unwrap();
        assert_eq!(img.dimensions(), (8, 4));
        assert!(img.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_memory_hit_on_second_realize() {
        let mut cache = ImageCache::new();
        let node = ImageNode::blank(8, 8).pad_pixels(16, 16, (4, 4)).unwrap();
        cache.realize(&node).unwrap();
        cache.realize(&node).unwrap();
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[test]
    fn test_bbox_and_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dot.png");
        write_fixture(&path);

        let mut cache = ImageCache::new();
        let node = cache.load_file(&path).unwrap();
        assert_eq!(cache.bbox(&node).unwrap(), Some(Rect::new(1, 2, 1, 1)));
        let h1 = cache.content_hash(&node).unwrap();
        let h2 = cache.content_hash(&node).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(cache.stats().compute_hits, 1);
    }

    #[test]
    fn test_disk_round_trip_is_sound() {
        let dir = tempdir().unwrap();
        let asset = dir.path().join("dot.png");
        let cache_path = dir.path().join("cache.bin");
        write_fixture(&asset);

        let mut first = ImageCache::new();
        let node = first.load_file(&asset).unwrap().modify(Modifier::FlipH);
        let fresh = first.realize(&node).unwrap();
        first.save(&cache_path).unwrap();

        let mut second = ImageCache::load(&cache_path).unwrap();
        let node = second.load_file(&asset).unwrap().modify(Modifier::FlipH);
        assert!(second.is_cached(&node));
        let cached = second.realize(&node).unwrap();
        assert_eq!(*fresh, *cached);
        assert_eq!(second.stats().disk_hits, 1);
        assert_eq!(second.stats().realized, 0);
    }

    #[test]
    fn test_untouched_entries_are_dropped() {
        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("cache.bin");

        let mut first = ImageCache::new();
        first.realize(&ImageNode::blank(2, 2)).unwrap();
        first.realize(&ImageNode::blank(3, 3)).unwrap();
        first.save(&cache_path).unwrap();

        let mut second = ImageCache::load(&cache_path).unwrap();
        second.realize(&ImageNode::blank(2, 2)).unwrap();
        second.save(&cache_path).unwrap();

        let third = ImageCache::load(&cache_path).unwrap();
        assert!(third.is_cached(&ImageNode::blank(2, 2)));
        assert!(!third.is_cached(&ImageNode::blank(3, 3)));
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = tempdir().unwrap();
        let cache_path = dir.path().join("cache.bin");
        fs::write(&cache_path, b"not a cache").unwrap();
        let cache = ImageCache::load(&cache_path).unwrap();
        assert!(!cache.is_cached(&ImageNode::blank(1, 1)));
    }

    #[test]
    fn test_load_file_is_deduplicated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dot.png");
        write_fixture(&path);

        let mut cache = ImageCache::new();
        let a = cache.load_file(&path).unwrap();
        let b = cache.load_file(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.used_assets().count(), 1);
    }
}
