//! Structures: multi-cell objects drawn from one or more mesh parts.

use crate::error::{GenError, Result};
use crate::imaging::{Anim, ImageNode, TILE_SIZE};

use super::block::BlockShape;
use super::field::{Check, OneOf};
use super::mesh::Mesh;
use super::scope::{Prototype, ScopeMut};
use super::Kind;

/// Per-cell shapes of a structure, `x` fastest, then `y`, then `z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeGrid {
    pub size: (u32, u32, u32),
    pub cells: Vec<BlockShape>,
}

impl ShapeGrid {
    pub fn filled(shape: BlockShape, size: (u32, u32, u32)) -> Self {
        let len = (size.0 * size.1 * size.2) as usize;
        Self {
            size,
            cells: vec![shape; len],
        }
    }

    pub fn from_cells(size: (u32, u32, u32), cells: Vec<BlockShape>) -> Result<Self> {
        let expected = (size.0 * size.1 * size.2) as usize;
        if cells.len() != expected {
            return Err(GenError::eval(format!(
                "shape grid {:?} needs {} cells, got {}",
                size,
                expected,
                cells.len()
            )));
        }
        Ok(Self { size, cells })
    }

    /// Packed byte codes for the client.
    pub fn codes(&self) -> Vec<u8> {
        self.cells.iter().map(|s| s.code()).collect()
    }
}

/// A still image or an animation.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Image(ImageNode),
    Anim(Anim),
}

impl Visual {
    pub fn size(&self) -> (u32, u32) {
        match self {
            Visual::Image(img) => img.size(),
            Visual::Anim(anim) => anim.frame_size(),
        }
    }

    /// The image, or an animation's first frame.
    pub fn first_frame(&self) -> &ImageNode {
        match self {
            Visual::Image(img) => img,
            Visual::Anim(anim) => anim.first(),
        }
    }
}

/// One drawn piece of a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub mesh: Mesh,
    pub visual: Visual,
    /// Projected `(x, v)` of the visual's top-left pixel.
    pub base: (i32, i32),
}

impl Part {
    /// Part whose image top-left lines up with the mesh's projected bounds.
    pub fn new(mesh: Mesh, visual: Visual) -> Self {
        let base = mesh
            .projected_bounds()
            .map_or((0, 0), |b| (b.x0, b.v0));
        Self { mesh, visual, base }
    }

    pub fn with_base(mesh: Mesh, visual: Visual, base: (i32, i32)) -> Self {
        Self { mesh, visual, base }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructureProto {
    pub name: String,
    pub shape: Option<ShapeGrid>,
    pub layer: Option<u8>,
    pub image: Option<Visual>,
    pub parts: Option<Vec<Part>>,
}

impl StructureProto {
    /// The image an icon would be derived from.
    pub fn preview(&self) -> Option<&ImageNode> {
        match (&self.image, &self.parts) {
            (Some(visual), _) => Some(visual.first_frame()),
            (None, Some(parts)) => parts.first().map(|p| p.visual.first_frame()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Structure {
    pub name: String,
    pub shape: ShapeGrid,
    pub layer: u8,
    pub parts: Vec<Part>,
}

impl Structure {
    /// Size in tiles.
    pub fn size(&self) -> (u32, u32, u32) {
        self.shape.size
    }
}

impl Prototype for StructureProto {
    type Output = Structure;
    const KIND: Kind = Kind::Structure;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Structure> {
        let check = Check::new("structure", &self.name);
        let shape = check.require("shape", &self.shape)?.clone();
        let parts = match check.require_one(("image", &self.image), ("parts", &self.parts))? {
            OneOf::First(visual) => vec![default_part(&shape, visual)],
            OneOf::Second(parts) => parts.clone(),
        };
        if parts.is_empty() {
            return Err(check.invalid("structure has no parts"));
        }
        Ok(Structure {
            name: self.name.clone(),
            shape,
            layer: self.layer.unwrap_or(0),
            parts,
        })
    }
}

/// A single part covering the structure's box. The image's bottom edge sits
/// on the box's front bottom edge, so tall images overhang upwards.
fn default_part(shape: &ShapeGrid, visual: &Visual) -> Part {
    let (sx, sy, sz) = shape.size;
    let t = TILE_SIZE as i32;
    let mesh = Mesh::cuboid(sx as i32 * t, sy as i32 * t, sz as i32 * t);
    let (_, h) = visual.size();
    Part::with_base(mesh, visual.clone(), (0, sy as i32 * t - h as i32))
}

impl ScopeMut<'_, StructureProto> {
    pub fn shape(&mut self, shape: ShapeGrid) -> &mut Self {
        self.set(move |p| p.shape = Some(shape.clone()))
    }

    pub fn layer(&mut self, layer: u8) -> &mut Self {
        self.set(move |p| p.layer = Some(layer))
    }

    pub fn image(&mut self, visual: Visual) -> &mut Self {
        self.set(move |p| p.image = Some(visual.clone()))
    }

    pub fn parts(&mut self, parts: Vec<Part>) -> &mut Self {
        self.set(move |p| p.parts = Some(parts.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anvil() -> StructureProto {
        StructureProto {
            name: "anvil".into(),
            shape: Some(ShapeGrid::filled(BlockShape::Solid, (1, 1, 1))),
            layer: Some(1),
            image: Some(Visual::Image(ImageNode::blank(32, 64))),
            parts: None,
        }
    }

    #[test]
    fn test_default_part_base() {
        let s = anvil().instantiate().unwrap();
        assert_eq!(s.parts.len(), 1);
        assert_eq!(s.parts[0].base, (0, -32));
        assert_eq!(s.layer, 1);
        assert_eq!(s.shape.codes(), vec![BlockShape::Solid.code()]);
    }

    #[test]
    fn test_image_and_parts_conflict() {
        let mut proto = anvil();
        proto.parts = Some(vec![]);
        assert_eq!(proto.instantiate().unwrap_err().code(), "ambiguous-field");
    }

    #[test]
    fn test_shape_grid_size_checked() {
        assert!(ShapeGrid::from_cells((2, 1, 1), vec![BlockShape::Solid]).is_err());
        let grid = ShapeGrid::from_cells((2, 1, 1), vec![BlockShape::Solid, BlockShape::Floor]);
        assert_eq!(grid.unwrap().cells.len(), 2);
    }

    #[test]
    fn test_part_default_base() {
        let part = Part::new(Mesh::cuboid(32, 32, 32), Visual::Image(ImageNode::blank(32, 64)));
        assert_eq!(part.base, (0, -32));
    }
}
