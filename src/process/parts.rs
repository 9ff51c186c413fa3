//! Structure part clipping, deduplication and sheet placement.
//!
//! A part's image is clipped to the intersection of its mesh's projected
//! bounds and the image's opaque bounds. Clipped images are deduplicated by
//! content hash and packed in 32px cells onto 1024px pages. Animated parts
//! are split into a static base (packed with the other parts) and a
//! filmstrip of the changing region (packed onto separate pages).

use std::collections::HashMap;

use image::{imageops, RgbaImage};
use serde::Serialize;
use tracing::{debug, trace};

use crate::builder::{Bounds2, Part, Structure, Visual};
use crate::error::Result;
use crate::imaging::{ImageCache, ImageNode, Rect, TILE_SIZE};
use crate::pack::{pack_boxes, PageImage, SHEET_PX};

use super::depth::rasterize_depth;
use super::split::split_anim;

/// Where a part's animated region lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartAnim {
    pub sheet: u32,
    /// Sheet pixel of world origin for frame 0.
    pub offset: (i32, i32),
    pub size: (u32, u32),
    pub length: u32,
    pub framerate: u32,
    pub oneshot: bool,
}

/// Where a part's static image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartPlacement {
    pub sheet: u32,
    /// Sheet pixel that corresponds to world origin `(0, 0, 0)`.
    pub offset: (i32, i32),
    pub size: (u32, u32),
    pub anim: Option<PartAnim>,
}

/// Packed structure sheets and per-part placements.
#[derive(Debug, Default)]
pub struct StructureSheets {
    pub colour: Vec<RgbaImage>,
    pub depth: Vec<RgbaImage>,
    pub anim_colour: Vec<RgbaImage>,
    pub anim_depth: Vec<RgbaImage>,
    /// Indexed like the structure list.
    pub parts: Vec<Vec<PartPlacement>>,
}

struct ClippedAnim {
    strip: ImageNode,
    depth_strip: RgbaImage,
    origin: (i32, i32),
    frame_size: (u32, u32),
    length: u32,
    framerate: u32,
    oneshot: bool,
}

struct Clipped {
    image: ImageNode,
    depth: RgbaImage,
    base: (i32, i32),
    anim: Option<ClippedAnim>,
}

fn opaque_bounds(visual: &Visual, cache: &mut ImageCache) -> Result<Option<Rect>> {
    match visual {
        Visual::Image(img) => cache.bbox(img),
        Visual::Anim(anim) => {
            let mut acc: Option<Rect> = None;
            for frame in anim.frames() {
                if let Some(r) = cache.bbox(frame)? {
                    acc = Some(acc.map_or(r, |a| a.union(&r)));
                }
            }
            Ok(acc)
        }
    }
}

fn clip_part(part: &Part, cache: &mut ImageCache) -> Result<Option<Clipped>> {
    let Some(mesh_bounds) = part.mesh.projected_bounds() else {
        return Ok(None);
    };
    let Some(opaque) = opaque_bounds(&part.visual, cache)? else {
        return Ok(None);
    };
    let Some(clip) = mesh_bounds.intersect(&Bounds2::from_rect(&opaque, part.base)) else {
        return Ok(None);
    };
    let local = Rect::new(
        (clip.x0 - part.base.0) as u32,
        (clip.v0 - part.base.1) as u32,
        (clip.x1 - clip.x0) as u32,
        (clip.v1 - clip.v0) as u32,
    );
    let depth = rasterize_depth(&part.mesh, &clip);
    let base = (clip.x0, clip.v0);

    let (image, anim) = match &part.visual {
        Visual::Image(img) => (img.crop(local)?, None),
        Visual::Anim(anim) => {
            let clipped = anim.map(|frame| frame.crop(local))?;
            let split = split_anim(&clipped, cache)?;
            let anim = match split.anim {
                Some((rect, frames)) => {
                    let region = imageops::crop_imm(&depth, rect.x, rect.y, rect.w, rect.h).to_image();
                    let length = frames.len() as u32;
                    let mut depth_strip = RgbaImage::new(rect.w * length, rect.h);
                    for i in 0..length {
                        imageops::replace(&mut depth_strip, &region, (i * rect.w) as i64, 0);
                    }
                    Some(ClippedAnim {
                        strip: frames.flatten()?,
                        depth_strip,
                        origin: (base.0 + rect.x as i32, base.1 + rect.y as i32),
                        frame_size: (rect.w, rect.h),
                        length,
                        framerate: frames.rate,
                        oneshot: frames.oneshot,
                    })
                }
                None => None,
            };
            (split.base, anim)
        }
    };
    Ok(Some(Clipped {
        image,
        depth,
        base,
        anim,
    }))
}

/// Images deduplicated by content and packed onto pages.
struct Atlas {
    unique: Vec<(ImageNode, RgbaImage)>,
    by_hash: HashMap<String, usize>,
}

struct PackedAtlas {
    colour: Vec<RgbaImage>,
    depth: Vec<RgbaImage>,
    /// `(page, pixel position)` per unique entry.
    positions: Vec<(u32, (u32, u32))>,
}

impl Atlas {
    fn new() -> Self {
        Self {
            unique: Vec::new(),
            by_hash: HashMap::new(),
        }
    }

    fn add(&mut self, image: &ImageNode, depth: &RgbaImage, cache: &mut ImageCache) -> Result<usize> {
        let hash = cache.content_hash(image)?;
        if let Some(&idx) = self.by_hash.get(&hash) {
            return Ok(idx);
        }
        let idx = self.unique.len();
        self.unique.push((image.clone(), depth.clone()));
        self.by_hash.insert(hash, idx);
        Ok(idx)
    }

    fn pack(self, cache: &mut ImageCache) -> Result<PackedAtlas> {
        let boxes: Vec<(u32, u32)> = self
            .unique
            .iter()
            .map(|(img, _)| (img.width().div_ceil(TILE_SIZE), img.height().div_ceil(TILE_SIZE)))
            .collect();
        let cells = SHEET_PX / TILE_SIZE;
        let packing = pack_boxes(&boxes, (cells, cells))?;

        let mut colour = vec![PageImage::new(); packing.pages];
        let mut depth = vec![PageImage::new(); packing.pages];
        let mut positions = Vec::with_capacity(self.unique.len());
        for ((img, depth_img), &(page, (cx, cy))) in self.unique.iter().zip(&packing.placements) {
            let pos = (cx * TILE_SIZE, cy * TILE_SIZE);
            colour[page].blit(&*cache.realize(img)?, pos);
            depth[page].blit(depth_img, pos);
            positions.push((page as u32, pos));
        }
        Ok(PackedAtlas {
            colour: colour.into_iter().map(|p| p.finish(TILE_SIZE)).collect(),
            depth: depth.into_iter().map(|p| p.finish(TILE_SIZE)).collect(),
            positions,
        })
    }
}

fn offset_of(pos: (u32, u32), origin: (i32, i32)) -> (i32, i32) {
    (pos.0 as i32 - origin.0, pos.1 as i32 - origin.1)
}

/// Clip, deduplicate and pack the parts of every structure.
pub fn layout_structures(structures: &[Structure], cache: &mut ImageCache) -> Result<StructureSheets> {
    let mut statics = Atlas::new();
    let mut anims = Atlas::new();
    // per structure: (static idx, base, size, Option<(anim idx, clipped anim meta)>)
    let mut pending = Vec::with_capacity(structures.len());

    for structure in structures {
        let mut parts = Vec::new();
        for (i, part) in structure.parts.iter().enumerate() {
            let Some(clipped) = clip_part(part, cache)? else {
                trace!(structure = %structure.name, part = i, "part clipped away");
                continue;
            };
            let idx = statics.add(&clipped.image, &clipped.depth, cache)?;
            let anim = match clipped.anim {
                Some(anim) => Some((anims.add(&anim.strip, &anim.depth_strip, cache)?, anim)),
                None => None,
            };
            parts.push((idx, clipped.base, clipped.image.size(), anim));
        }
        pending.push(parts);
    }

    debug!(
        parts = pending.iter().map(Vec::len).sum::<usize>(),
        unique = statics.unique.len(),
        anims = anims.unique.len(),
        "packing structure parts"
    );
    let statics = statics.pack(cache)?;
    let anims = anims.pack(cache)?;

    let parts = pending
        .into_iter()
        .map(|parts| {
            parts
                .into_iter()
                .map(|(idx, base, size, anim)| {
                    let (sheet, pos) = statics.positions[idx];
                    PartPlacement {
                        sheet,
                        offset: offset_of(pos, base),
                        size,
                        anim: anim.map(|(aidx, meta)| {
                            let (sheet, pos) = anims.positions[aidx];
                            PartAnim {
                                sheet,
                                offset: offset_of(pos, meta.origin),
                                size: meta.frame_size,
                                length: meta.length,
                                framerate: meta.framerate,
                                oneshot: meta.oneshot,
                            }
                        }),
                    }
                })
                .collect()
        })
        .collect();

    Ok(StructureSheets {
        colour: statics.colour,
        depth: statics.depth,
        anim_colour: anims.colour,
        anim_depth: anims.depth,
        parts,
    })
}
