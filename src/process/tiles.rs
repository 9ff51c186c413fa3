//! Tile deduplication for block sides.

use std::collections::HashMap;

use crate::builder::Block;
use crate::error::Result;
use crate::imaging::{ImageCache, ImageNode, TILE_SIZE};

/// Unique tiles by content. Tile 0 is always the blank tile.
#[derive(Debug, Clone)]
pub struct TileSet {
    tiles: Vec<ImageNode>,
    by_hash: HashMap<String, u32>,
}

impl TileSet {
    pub fn new(cache: &mut ImageCache) -> Result<Self> {
        let mut set = Self {
            tiles: Vec::new(),
            by_hash: HashMap::new(),
        };
        set.intern(&ImageNode::blank(TILE_SIZE, TILE_SIZE), cache)?;
        Ok(set)
    }

    /// ID of the tile with `node`'s pixels, adding it if new.
    pub fn intern(&mut self, node: &ImageNode, cache: &mut ImageCache) -> Result<u32> {
        let hash = cache.content_hash(node)?;
        if let Some(&id) = self.by_hash.get(&hash) {
            return Ok(id);
        }
        let id = self.tiles.len() as u32;
        self.tiles.push(node.clone());
        self.by_hash.insert(hash, id);
        Ok(id)
    }

    pub fn tiles(&self) -> &[ImageNode] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Tile IDs for each block's `[front, back, top, bottom]`; unset sides use
/// the blank tile.
pub fn block_tiles(
    blocks: &[Block],
    tiles: &mut TileSet,
    cache: &mut ImageCache,
) -> Result<Vec<[u32; 4]>> {
    blocks
        .iter()
        .map(|block| {
            let mut ids = [0u32; 4];
            for (slot, side) in ids.iter_mut().zip(&block.sides) {
                if let Some(image) = side {
                    *slot = tiles.intern(image, cache)?;
                }
            }
            Ok(ids)
        })
        .collect()
}
