//! Items and the recipes that produce them.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::imaging::{ImageNode, TILE_SIZE};

use super::field::Check;
use super::scope::{Prototype, ScopeMut};
use super::structure::StructureProto;
use super::Kind;

/// Side of a small item icon.
pub const SMALL_ICON: u32 = 16;

/// How an item icon is cut from its structure's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSource {
    /// Centre the image in a square and resample it to one tile.
    #[default]
    Thumbnail,
    /// One tile taken at this pixel offset.
    Offset(u32, u32),
}

#[derive(Debug, Clone, Default)]
pub struct ItemProto {
    pub name: String,
    pub display_name: Option<String>,
    pub icon: Option<ImageNode>,
}

impl ItemProto {
    /// An item named after `structure` whose icon is derived from the
    /// structure's image (first frame when animated).
    pub fn from_structure(structure: &StructureProto, source: IconSource) -> Result<Self> {
        let icon = match (structure.preview(), source) {
            (Some(img), IconSource::Thumbnail) => Some(img.square_thumbnail(TILE_SIZE)?),
            (Some(img), IconSource::Offset(x, y)) => {
                Some(img.extract((x, y), (TILE_SIZE, TILE_SIZE), Some((1, 1)))?)
            }
            (None, _) => None,
        };
        Ok(Self {
            name: structure.name.clone(),
            display_name: Some(structure.name.clone()),
            icon,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub name: String,
    pub display_name: String,
    pub icon: ImageNode,
}

impl Prototype for ItemProto {
    type Output = Item;
    const KIND: Kind = Kind::Item;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Item> {
        let check = Check::new("item", &self.name);
        let icon = check.require("icon", &self.icon)?;
        let ok = [SMALL_ICON, TILE_SIZE]
            .iter()
            .any(|&side| icon.size() == (side, side));
        if !ok {
            return Err(check.invalid(format!(
                "icon is {}x{}, expected 16x16 or 32x32",
                icon.width(),
                icon.height()
            )));
        }
        Ok(Item {
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
            icon: icon.clone(),
        })
    }
}

impl ScopeMut<'_, ItemProto> {
    pub fn display_name(&mut self, text: &str) -> &mut Self {
        let text = text.to_string();
        self.set(move |p| p.display_name = Some(text.clone()))
    }

    pub fn icon(&mut self, icon: ImageNode) -> &mut Self {
        self.set(move |p| p.icon = Some(icon.clone()))
    }

    /// Derive an item from a structure prototype; `name` defaults to the
    /// structure's name.
    pub fn from_structure(
        &mut self,
        structure: &StructureProto,
        name: Option<&str>,
        source: IconSource,
    ) -> Result<ScopeMut<'_, ItemProto>> {
        let proto = ItemProto::from_structure(structure, source)?;
        let name = name.unwrap_or(&structure.name).to_string();
        self.from_clone([(name, proto)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeProto {
    pub name: String,
    pub display_name: Option<String>,
    pub station: Option<String>,
    pub inputs: BTreeMap<String, u32>,
    pub outputs: BTreeMap<String, u32>,
}

impl RecipeProto {
    /// A recipe producing one of `item`.
    pub fn from_item(item: &ItemProto) -> Self {
        let mut outputs = BTreeMap::new();
        outputs.insert(item.name.clone(), 1);
        Self {
            name: item.name.clone(),
            display_name: Some(
                item.display_name
                    .clone()
                    .unwrap_or_else(|| item.name.clone()),
            ),
            station: None,
            inputs: BTreeMap::new(),
            outputs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub display_name: String,
    pub station: String,
    pub inputs: BTreeMap<String, u32>,
    pub outputs: BTreeMap<String, u32>,
}

impl Prototype for RecipeProto {
    type Output = Recipe;
    const KIND: Kind = Kind::Recipe;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Recipe> {
        let check = Check::new("recipe", &self.name);
        let station = check.require("station", &self.station)?;
        if self.outputs.is_empty() {
            return Err(check.invalid("recipe has no outputs"));
        }
        Ok(Recipe {
            name: self.name.clone(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.name.clone()),
            station: station.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        })
    }
}

impl ScopeMut<'_, RecipeProto> {
    pub fn display_name(&mut self, text: &str) -> &mut Self {
        let text = text.to_string();
        self.set(move |p| p.display_name = Some(text.clone()))
    }

    pub fn station(&mut self, structure: &str) -> &mut Self {
        let structure = structure.to_string();
        self.set(move |p| p.station = Some(structure.clone()))
    }

    pub fn input(&mut self, item: &str, count: u32) -> &mut Self {
        let item = item.to_string();
        self.set(move |p| {
            p.inputs.insert(item.clone(), count);
        })
    }

    pub fn output(&mut self, item: &str, count: u32) -> &mut Self {
        let item = item.to_string();
        self.set(move |p| {
            p.outputs.insert(item.clone(), count);
        })
    }

    /// Derive a recipe from an item prototype; `name` defaults to the
    /// item's name.
    pub fn from_item(&mut self, item: &ItemProto, name: Option<&str>) -> Result<ScopeMut<'_, RecipeProto>> {
        let proto = RecipeProto::from_item(item);
        let name = name.unwrap_or(&item.name).to_string();
        self.from_clone([(name, proto)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::block::BlockShape;
    use crate::builder::scope::Builder;
    use crate::builder::structure::{ShapeGrid, Visual};

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
    fn test_item_from_structure_thumbnail() {
        let item = ItemProto::from_structure(&anvil(), IconSource::Thumbnail)
            .unwrap()
            .instantiate()
            .unwrap();
        assert_eq!(item.display_name, "anvil");
        assert_eq!(item.icon.size(), (32, 32));
    }

    #[test]
    fn test_item_from_structure_offset() {
        let proto = ItemProto::from_structure(&anvil(), IconSource::Offset(0, 32)).unwrap();
        assert_eq!(proto.icon.unwrap().size(), (32, 32));
        assert!(ItemProto::from_structure(&anvil(), IconSource::Offset(0, 48)).is_err());
    }

    #[test]
    fn test_recipe_from_item() {
        let mut items = Builder::<ItemProto>::new();
        items
            .root()
            .from_structure(&anvil(), None, IconSource::Thumbnail)
            .unwrap();
        let item = items.get("anvil").unwrap();

        let mut recipes = Builder::<RecipeProto>::new();
        recipes
            .root()
            .from_item(item, None)
            .unwrap()
            .station("anvil")
            .input("stone", 10)
            .input("wood", 5);
        let recipe = recipes.get("anvil").unwrap().instantiate().unwrap();
        assert_eq!(recipe.display_name, "anvil");
        assert_eq!(recipe.outputs.get("anvil"), Some(&1));
        assert_eq!(recipe.inputs.len(), 2);
        assert_eq!(recipe.station, "anvil");
    }

    #[test]
    fn test_recipe_clone_does_not_share_maps() {
        let mut recipes = Builder::<RecipeProto>::new();
        {
            let mut root = recipes.root();
            let mut both = root.add_all(["a", "b"]).unwrap();
            both.member("a").unwrap().input("stone", 1);
        }
        assert!(recipes.get("b").unwrap().inputs.is_empty());
        assert_eq!(recipes.get("a").unwrap().inputs.len(), 1);
    }

    #[test]
    fn test_icon_size_checked() {
        let proto = ItemProto {
            name: "rock".into(),
            display_name: None,
            icon: Some(ImageNode::blank(20, 20)),
        };
        assert_eq!(proto.instantiate().unwrap_err().code(), "invalid-value");
    }
}
