//! Animation groups, sprites and attachment slots.
//!
//! An animation group declares named animation slots of a common frame size.
//! Slots are packed onto sheets (see [`crate::pack::layout_anim_group`]) and
//! every sprite of the group supplies one image per sheet.

use crate::error::Result;
use crate::imaging::ImageNode;

use super::field::Check;
use super::scope::{Prototype, ScopeMut};
use super::Kind;

/// Side of an animation sheet in pixels.
pub const ANIM_SHEET_PX: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimSlot {
    pub name: String,
    /// Number of frames.
    pub length: u32,
    pub framerate: u32,
    pub oneshot: bool,
    /// Slot whose frames this one reuses, horizontally mirrored.
    pub mirror_of: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimGroupProto {
    pub name: String,
    pub frame_size: Option<(u32, u32)>,
    pub sheet_px: Option<u32>,
    pub slots: Vec<AnimSlot>,
}

#[derive(Debug, Clone)]
pub struct AnimGroup {
    pub name: String,
    pub frame_size: (u32, u32),
    /// Page side in frames, per axis.
    pub page_cells: (u32, u32),
    pub slots: Vec<AnimSlot>,
}

impl Prototype for AnimGroupProto {
    type Output = AnimGroup;
    const KIND: Kind = Kind::AnimGroup;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<AnimGroup> {
        let check = Check::new("anim_group", &self.name);
        let (fw, fh) = *check.require("frame_size", &self.frame_size)?;
        let sheet_px = self.sheet_px.unwrap_or(ANIM_SHEET_PX);
        if fw == 0 || fh == 0 || fw > sheet_px || fh > sheet_px {
            return Err(check.invalid(format!(
                "frame size {}x{} does not fit a {}px sheet",
                fw, fh, sheet_px
            )));
        }
        if self.slots.is_empty() {
            return Err(check.invalid("group has no animations"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for slot in &self.slots {
            if !seen.insert(slot.name.as_str()) {
                return Err(check.invalid(format!("animation '{}' declared twice", slot.name)));
            }
        }
        for slot in &self.slots {
            if let Some(source) = &slot.mirror_of {
                if !seen.contains(source.as_str()) {
                    return Err(check.invalid(format!(
                        "animation '{}' mirrors unknown animation '{}'",
                        slot.name, source
                    )));
                }
            } else if slot.length == 0 {
                return Err(check.invalid(format!("animation '{}' has no frames", slot.name)));
            }
        }
        Ok(AnimGroup {
            name: self.name.clone(),
            frame_size: (fw, fh),
            page_cells: (sheet_px / fw, sheet_px / fh),
            slots: self.slots.clone(),
        })
    }
}

impl ScopeMut<'_, AnimGroupProto> {
    pub fn frame_size(&mut self, width: u32, height: u32) -> &mut Self {
        self.set(move |p| p.frame_size = Some((width, height)))
    }

    pub fn sheet_px(&mut self, px: u32) -> &mut Self {
        self.set(move |p| p.sheet_px = Some(px))
    }

    pub fn anim(&mut self, name: &str, length: u32, framerate: u32, oneshot: bool) -> &mut Self {
        let slot = AnimSlot {
            name: name.to_string(),
            length,
            framerate,
            oneshot,
            mirror_of: None,
        };
        self.set(move |p| p.slots.push(slot.clone()))
    }

    /// Declare `name` as a mirrored copy of `source`.
    pub fn mirror(&mut self, name: &str, source: &str) -> &mut Self {
        let slot = AnimSlot {
            name: name.to_string(),
            length: 0,
            framerate: 0,
            oneshot: false,
            mirror_of: Some(source.to_string()),
        };
        self.set(move |p| p.slots.push(slot.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpriteProto {
    pub name: String,
    pub group: Option<String>,
    pub images: Option<Vec<ImageNode>>,
}

/// One appearance of an animation group: an image per group sheet.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub name: String,
    pub group: String,
    pub images: Vec<ImageNode>,
}

impl Prototype for SpriteProto {
    type Output = Sprite;
    const KIND: Kind = Kind::Sprite;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Sprite> {
        let check = Check::new("sprite", &self.name);
        Ok(Sprite {
            name: self.name.clone(),
            group: check.require("group", &self.group)?.clone(),
            images: check.require("images", &self.images)?.clone(),
        })
    }
}

impl ScopeMut<'_, SpriteProto> {
    pub fn group(&mut self, group: &str) -> &mut Self {
        let group = group.to_string();
        self.set(move |p| p.group = Some(group.clone()))
    }

    pub fn images(&mut self, images: Vec<ImageNode>) -> &mut Self {
        self.set(move |p| p.images = Some(images.clone()))
    }
}

/// Variant name every attachment slot carries implicitly, with no sprite.
pub const NO_ATTACHMENT: &str = "none";

#[derive(Debug, Clone, Default)]
pub struct AttachSlotProto {
    pub name: String,
    pub group: Option<String>,
    pub variants: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone)]
pub struct AttachSlot {
    pub name: String,
    pub group: String,
    /// `(variant name, sprite name)`; starts with the `none` variant.
    pub variants: Vec<(String, Option<String>)>,
}

impl Prototype for AttachSlotProto {
    type Output = AttachSlot;
    const KIND: Kind = Kind::AttachSlot;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<AttachSlot> {
        let check = Check::new("attach_slot", &self.name);
        let group = check.require("group", &self.group)?.clone();
        let mut variants = vec![(NO_ATTACHMENT.to_string(), None)];
        for (name, sprite) in &self.variants {
            if variants.iter().any(|(n, _)| n == name) {
                return Err(check.invalid(format!("variant '{}' declared twice", name)));
            }
            variants.push((name.clone(), sprite.clone()));
        }
        Ok(AttachSlot {
            name: self.name.clone(),
            group,
            variants,
        })
    }
}

impl ScopeMut<'_, AttachSlotProto> {
    pub fn group(&mut self, group: &str) -> &mut Self {
        let group = group.to_string();
        self.set(move |p| p.group = Some(group.clone()))
    }

    pub fn variant(&mut self, name: &str, sprite: Option<&str>) -> &mut Self {
        let entry = (name.to_string(), sprite.map(str::to_string));
        self.set(move |p| p.variants.push(entry.clone()))
    }
}
