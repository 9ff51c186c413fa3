//! Image processing after instantiation: tiles, item icons, structure parts,
//! animation-group layouts and sprite checks.
//!
//! Everything here runs on ID-ordered instance lists, so sheet positions
//! follow IDs.

mod depth;
mod parts;
mod split;
mod tiles;

use std::rc::Rc;

use image::RgbaImage;
use tracing::{debug, info_span};

use crate::builder::Instances;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::imaging::{ImageCache, TILE_SIZE};
use crate::pack::{check_sprite_sizes, compose_grid, layout_anim_group, GroupLayout};

pub use depth::{depth_value, rasterize_depth};
pub use parts::{layout_structures, PartAnim, PartPlacement, StructureSheets};
pub use split::{changed_region, split_anim, Split};
pub use tiles::{block_tiles, TileSet};

/// Everything the emitter writes besides JSON.
#[derive(Debug)]
pub struct Processed {
    pub tiles: RgbaImage,
    pub tile_count: usize,
    /// `[front, back, top, bottom]` tile IDs per block.
    pub block_tiles: Vec<[u32; 4]>,
    pub items: RgbaImage,
    pub structures: StructureSheets,
    /// Per anim group; `None` when the layout failed and was reported.
    pub anim_layouts: Vec<Option<GroupLayout>>,
    /// Realized sheet images per sprite.
    pub sprites: Vec<Vec<Rc<RgbaImage>>>,
}

pub fn process_all(
    instances: &Instances,
    cache: &mut ImageCache,
    diagnostics: &mut Diagnostics,
) -> Result<Processed> {
    let _span = info_span!("process").entered();

    let mut tiles = TileSet::new(cache)?;
    let block_tiles = block_tiles(&instances.blocks, &mut tiles, cache)?;
    let tile_pixels = tiles
        .tiles()
        .iter()
        .map(|t| cache.realize(t))
        .collect::<Result<Vec<_>>>()?;
    let tile_sheet = compose_grid(&tile_pixels.iter().map(|t| t.as_ref()).collect::<Vec<_>>(), TILE_SIZE)?;
    debug!(blocks = block_tiles.len(), tiles = tiles.len(), "tiles deduplicated");

    let icons = instances
        .items
        .iter()
        .map(|item| cache.realize(&item.icon))
        .collect::<Result<Vec<_>>>()?;
    let item_sheet = compose_grid(&icons.iter().map(|i| i.as_ref()).collect::<Vec<_>>(), TILE_SIZE)?;

    let structures = layout_structures(&instances.structures, cache)?;

    let mut anim_layouts = Vec::with_capacity(instances.anim_groups.len());
    for group in &instances.anim_groups {
        let layout = diagnostics.absorb(layout_anim_group(group))?;
        anim_layouts.push(layout);
    }

    let mut sprites = Vec::with_capacity(instances.sprites.len());
    for sprite in &instances.sprites {
        let layout = instances
            .anim_groups
            .iter()
            .position(|g| g.name == sprite.group)
            .and_then(|i| anim_layouts[i].as_ref());
        if let Some(layout) = layout {
            let sizes: Vec<(u32, u32)> = sprite.images.iter().map(|img| img.size()).collect();
            check_sprite_sizes(&sprite.name, &sizes, layout)?;
        }
        let images = sprite
            .images
            .iter()
            .map(|img| cache.realize(img))
            .collect::<Result<Vec<_>>>()?;
        sprites.push(images);
    }

    Ok(Processed {
        tiles: tile_sheet,
        tile_count: tiles.len(),
        block_tiles,
        items: item_sheet,
        structures,
        anim_layouts,
        sprites,
    })
}
