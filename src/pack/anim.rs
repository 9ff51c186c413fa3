//! Animation-group sheet layout.

use std::collections::HashMap;

use serde::Serialize;

use crate::builder::{AnimGroup, AnimSlot, Check};
use crate::error::{GenError, Result};

use super::page::pack_boxes;

/// Where one animation's frames live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimPlacement {
    pub name: String,
    pub sheet: u32,
    /// Offset of the first frame, in frames.
    pub offset: (u32, u32),
    pub length: u32,
    pub framerate: u32,
    pub oneshot: bool,
    pub mirror: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    /// Pixel size of each sheet, trimmed to the used cells.
    pub sheet_sizes: Vec<(u32, u32)>,
    /// Slots in declaration order.
    pub anims: Vec<AnimPlacement>,
}

/// Pack a group's slots as `length × 1` boxes. Mirror slots take no space:
/// they share their source's placement with the mirror flag inverted.
pub fn layout_anim_group(group: &AnimGroup) -> Result<GroupLayout> {
    let owned: Vec<&AnimSlot> = group
        .slots
        .iter()
        .filter(|s| s.mirror_of.is_none())
        .collect();
    let boxes: Vec<(u32, u32)> = owned.iter().map(|s| (s.length, 1)).collect();
    let packing = pack_boxes(&boxes, group.page_cells)?;

    let mut extent = vec![(0u32, 0u32); packing.pages];
    let mut placed: HashMap<&str, AnimPlacement> = HashMap::new();
    for (slot, &(page, (x, y))) in owned.iter().zip(&packing.placements) {
        let e = &mut extent[page];
        e.0 = e.0.max(x + slot.length);
        e.1 = e.1.max(y + 1);
        placed.insert(
            &slot.name,
            AnimPlacement {
                name: slot.name.clone(),
                sheet: page as u32,
                offset: (x, y),
                length: slot.length,
                framerate: slot.framerate,
                oneshot: slot.oneshot,
                mirror: false,
            },
        );
    }

    let by_name: HashMap<&str, &AnimSlot> =
        group.slots.iter().map(|s| (s.name.as_str(), s)).collect();
    let anims = group
        .slots
        .iter()
        .map(|slot| resolve_slot(group, slot, &by_name, &placed))
        .collect::<Result<Vec<_>>>()?;

    let (fw, fh) = group.frame_size;
    Ok(GroupLayout {
        sheet_sizes: extent.iter().map(|&(w, h)| (w * fw, h * fh)).collect(),
        anims,
    })
}

/// Follow a mirror chain to an owned slot, flipping the flag at each hop.
fn resolve_slot(
    group: &AnimGroup,
    slot: &AnimSlot,
    by_name: &HashMap<&str, &AnimSlot>,
    placed: &HashMap<&str, AnimPlacement>,
) -> Result<AnimPlacement> {
    let check = Check::new("anim_group", &group.name);
    let mut mirror = false;
    let mut current = slot;
    for _ in 0..=group.slots.len() {
        match &current.mirror_of {
            None => {
                let source = placed.get(current.name.as_str()).ok_or_else(|| {
                    GenError::build(format!("animation '{}' was not packed", current.name))
                })?;
                return Ok(AnimPlacement {
                    name: slot.name.clone(),
                    mirror: source.mirror != mirror,
                    ..source.clone()
                });
            }
            Some(source) => {
                mirror = !mirror;
                current = by_name.get(source.as_str()).copied().ok_or_else(|| {
                    check.invalid(format!(
                        "animation '{}' mirrors unknown animation '{}'",
                        current.name, source
                    ))
                })?;
            }
        }
    }
    Err(check.invalid(format!("mirror chain of '{}' loops", slot.name)))
}

/// Check a sprite's images against the group's sheets.
pub fn check_sprite_sizes(
    sprite: &str,
    images: &[(u32, u32)],
    layout: &GroupLayout,
) -> Result<()> {
    if images.len() != layout.sheet_sizes.len() {
        return Err(GenError::SpriteSizeMismatch {
            sprite: sprite.to_string(),
            message: format!(
                "{} images for {} sheets",
                images.len(),
                layout.sheet_sizes.len()
            ),
        });
    }
    for (i, (got, want)) in images.iter().zip(&layout.sheet_sizes).enumerate() {
        if got != want {
            return Err(GenError::SpriteSizeMismatch {
                sprite: sprite.to_string(),
                message: format!(
                    "sheet {} is {}x{}, group expects {}x{}",
                    i, got.0, got.1, want.0, want.1
                ),
            });
        }
    }
    Ok(())
}
