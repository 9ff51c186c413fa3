//! Blocks: one map cell with a shape and up to four tile faces.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::imaging::{ImageNode, TILE_SIZE};

use super::field::Check;
use super::scope::{Prototype, ScopeMut};
use super::Kind;

/// Per-cell solidity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    Empty,
    Floor,
    Solid,
    RampN,
    RampS,
    RampE,
    RampW,
    RampTop,
}

impl BlockShape {
    pub const ALL: [BlockShape; 8] = [
        BlockShape::Empty,
        BlockShape::Floor,
        BlockShape::Solid,
        BlockShape::RampN,
        BlockShape::RampS,
        BlockShape::RampE,
        BlockShape::RampW,
        BlockShape::RampTop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlockShape::Empty => "empty",
            BlockShape::Floor => "floor",
            BlockShape::Solid => "solid",
            BlockShape::RampN => "ramp_n",
            BlockShape::RampS => "ramp_s",
            BlockShape::RampE => "ramp_e",
            BlockShape::RampW => "ramp_w",
            BlockShape::RampTop => "ramp_top",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Numeric code used in packed shape arrays.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Tile faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Side {
    Front,
    Back,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Front, Side::Back, Side::Top, Side::Bottom];

    pub fn name(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
            Side::Top => "top",
            Side::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockProto {
    pub name: String,
    pub shape: Option<BlockShape>,
    pub front: Option<ImageNode>,
    pub back: Option<ImageNode>,
    pub top: Option<ImageNode>,
    pub bottom: Option<ImageNode>,
    pub light_color: Option<(u8, u8, u8)>,
    pub light_radius: Option<u8>,
}

impl BlockProto {
    fn side_mut(&mut self, side: Side) -> &mut Option<ImageNode> {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
            Side::Top => &mut self.top,
            Side::Bottom => &mut self.bottom,
        }
    }
}

/// A block after instantiation. Sides hold tile images until tile IDs are
/// assigned.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub shape: BlockShape,
    /// Indexed by [`Side`] order.
    pub sides: [Option<ImageNode>; 4],
    pub light: Option<((u8, u8, u8), u8)>,
}

impl Prototype for BlockProto {
    type Output = Block;
    const KIND: Kind = Kind::Block;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Block> {
        let check = Check::new("block", &self.name);
        let shape = *check.require("shape", &self.shape)?;
        let light = check.pair(
            ("light_color", &self.light_color),
            ("light_radius", &self.light_radius),
        )?;
        let sides = [
            self.front.clone(),
            self.back.clone(),
            self.top.clone(),
            self.bottom.clone(),
        ];
        for (side, image) in Side::ALL.iter().zip(&sides) {
            if let Some(image) = image {
                if image.size() != (TILE_SIZE, TILE_SIZE) {
                    return Err(check.invalid(format!(
                        "{} tile is {}x{}, expected {}x{}",
                        side.name(),
                        image.width(),
                        image.height(),
                        TILE_SIZE,
                        TILE_SIZE
                    )));
                }
            }
        }
        Ok(Block {
            name: self.name.clone(),
            shape,
            sides,
            light,
        })
    }
}

impl ScopeMut<'_, BlockProto> {
    pub fn shape(&mut self, shape: BlockShape) -> &mut Self {
        self.set(move |p| p.shape = Some(shape))
    }

    pub fn side(&mut self, side: Side, image: ImageNode) -> &mut Self {
        self.set(move |p| *p.side_mut(side) = Some(image.clone()))
    }

    pub fn front(&mut self, image: ImageNode) -> &mut Self {
        self.side(Side::Front, image)
    }

    pub fn back(&mut self, image: ImageNode) -> &mut Self {
        self.side(Side::Back, image)
    }

    pub fn top(&mut self, image: ImageNode) -> &mut Self {
        self.side(Side::Top, image)
    }

    pub fn bottom(&mut self, image: ImageNode) -> &mut Self {
        self.side(Side::Bottom, image)
    }

    pub fn light(&mut self, color: (u8, u8, u8), radius: u8) -> &mut Self {
        self.set(move |p| {
            p.light_color = Some(color);
            p.light_radius = Some(radius);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::scope::Builder;

    #[test]
    fn test_shape_names() {
        for shape in BlockShape::ALL {
            assert_eq!(BlockShape::from_name(shape.name()), Some(shape));
        }
        assert_eq!(BlockShape::from_name("ramp_sideways"), None);
        assert_eq!(
            serde_json::to_string(&BlockShape::RampTop).unwrap(),
            "\"ramp_top\""
        );
    }

    #[test]
    fn test_instantiate_requires_shape() {
        let mut b = Builder::<BlockProto>::new();
        b.root().add("grass").unwrap();
        let err = b.get("grass").unwrap().instantiate().unwrap_err();
        assert_eq!(err.code(), "missing-field");
    }

    #[test]
    fn test_instantiate_block() {
        let mut b = Builder::<BlockProto>::new();
        b.root()
            .add("torch")
            .unwrap()
            .shape(BlockShape::Floor)
            .bottom(ImageNode::blank(32, 32))
            .light((255, 200, 100), 6);
        let block = b.get("torch").unwrap().instantiate().unwrap();
        assert_eq!(block.shape, BlockShape::Floor);
        assert!(block.sides[3].is_some());
        assert!(block.sides[0].is_none());
        assert_eq!(block.light, Some(((255, 200, 100), 6)));
    }

    #[test]
    fn test_half_light_is_missing_field() {
        let proto = BlockProto {
            name: "lamp".into(),
            shape: Some(BlockShape::Solid),
            light_color: Some((1, 2, 3)),
            ..Default::default()
        };
        assert!(proto.instantiate().is_err());
    }

    #[test]
    fn test_tile_size_checked() {
        let proto = BlockProto {
            name: "big".into(),
            shape: Some(BlockShape::Floor),
            top: Some(ImageNode::blank(64, 32)),
            ..Default::default()
        };
        assert_eq!(proto.instantiate().unwrap_err().code(), "invalid-value");
    }
}
