//! Builder registry and prototype kinds.
//!
//! Data modules declare entities by adding prototypes to the per-kind
//! builders in [`Builders`]. Once every module has run, the registry is
//! consumed by [`Builders::instantiate`], which validates each prototype and
//! produces the concrete entities. Consuming the registry is what freezes
//! it: nothing can be declared after instantiation starts.

mod anim_group;
mod block;
mod extra;
mod field;
mod item;
mod loot;
mod mesh;
mod scope;
mod structure;

use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::error::Result;

pub use anim_group::{
    AnimGroup, AnimGroupProto, AnimSlot, AttachSlot, AttachSlotProto, Sprite, SpriteProto,
    ANIM_SHEET_PX, NO_ATTACHMENT,
};
pub use block::{Block, BlockProto, BlockShape, Side};
pub use extra::{Extra, ExtraFn, ExtraGen, ExtraProto};
pub use field::{Check, OneOf};
pub use item::{IconSource, Item, ItemProto, Recipe, RecipeProto, SMALL_ICON};
pub use loot::{LootEntry, LootMode, LootObject, LootRef, LootTableDef};
pub use mesh::{project, Bounds2, Mesh, Vertex};
pub use scope::{Builder, Prototype, ScopeId, ScopeMut};
pub use structure::{Part, ShapeGrid, Structure, StructureProto, Visual};

/// Entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Block,
    Structure,
    Item,
    Recipe,
    AnimGroup,
    Sprite,
    AttachSlot,
    LootTable,
    Extra,
}

impl Kind {
    pub const ALL: [Kind; 9] = [
        Kind::Block,
        Kind::Structure,
        Kind::Item,
        Kind::Recipe,
        Kind::AnimGroup,
        Kind::Sprite,
        Kind::AttachSlot,
        Kind::LootTable,
        Kind::Extra,
    ];

    /// Name used in section headers and `INSTANCES.<kind>`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Block => "block",
            Kind::Structure => "structure",
            Kind::Item => "item",
            Kind::Recipe => "recipe",
            Kind::AnimGroup => "anim_group",
            Kind::Sprite => "sprite",
            Kind::AttachSlot => "attach_slot",
            Kind::LootTable => "loot_table",
            Kind::Extra => "extra",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// The process-wide registry of declared prototypes.
#[derive(Debug, Default)]
pub struct Builders {
    pub block: Builder<BlockProto>,
    pub structure: Builder<StructureProto>,
    pub item: Builder<ItemProto>,
    pub recipe: Builder<RecipeProto>,
    pub anim_group: Builder<AnimGroupProto>,
    pub sprite: Builder<SpriteProto>,
    pub attach_slot: Builder<AttachSlotProto>,
    pub extra: Builder<ExtraProto>,
    pub loot_tables: Vec<LootTableDef>,
}

/// Concrete entities, in declaration order until IDs are assigned.
#[derive(Debug, Default)]
pub struct Instances {
    pub blocks: Vec<Block>,
    pub structures: Vec<Structure>,
    pub items: Vec<Item>,
    pub recipes: Vec<Recipe>,
    pub anim_groups: Vec<AnimGroup>,
    pub sprites: Vec<Sprite>,
    pub attach_slots: Vec<AttachSlot>,
    pub extras: Vec<Extra>,
    pub loot_tables: Vec<LootTableDef>,
}

impl Builders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a prototype of `kind` named `name` exists.
    pub fn contains(&self, kind: Kind, name: &str) -> bool {
        match kind {
            Kind::Block => self.block.contains(name),
            Kind::Structure => self.structure.contains(name),
            Kind::Item => self.item.contains(name),
            Kind::Recipe => self.recipe.contains(name),
            Kind::AnimGroup => self.anim_group.contains(name),
            Kind::Sprite => self.sprite.contains(name),
            Kind::AttachSlot => self.attach_slot.contains(name),
            Kind::LootTable => self.loot_tables.iter().any(|t| t.name == name),
            Kind::Extra => self.extra.contains(name),
        }
    }

    /// Declared names of `kind`, in declaration order.
    pub fn names(&self, kind: Kind) -> Vec<String> {
        fn of<P: Prototype>(b: &Builder<P>) -> Vec<String> {
            b.iter().map(|p| p.name().to_string()).collect()
        }
        match kind {
            Kind::Block => of(&self.block),
            Kind::Structure => of(&self.structure),
            Kind::Item => of(&self.item),
            Kind::Recipe => of(&self.recipe),
            Kind::AnimGroup => of(&self.anim_group),
            Kind::Sprite => of(&self.sprite),
            Kind::AttachSlot => of(&self.attach_slot),
            Kind::LootTable => self.loot_tables.iter().map(|t| t.name.clone()).collect(),
            Kind::Extra => of(&self.extra),
        }
    }

    pub fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Block => self.block.len(),
            Kind::Structure => self.structure.len(),
            Kind::Item => self.item.len(),
            Kind::Recipe => self.recipe.len(),
            Kind::AnimGroup => self.anim_group.len(),
            Kind::Sprite => self.sprite.len(),
            Kind::AttachSlot => self.attach_slot.len(),
            Kind::LootTable => self.loot_tables.len(),
            Kind::Extra => self.extra.len(),
        }
    }

    /// Validate every prototype and build the concrete entities. Invalid
    /// prototypes are reported and skipped; fatal errors propagate.
    pub fn instantiate(self, diagnostics: &mut Diagnostics) -> Result<Instances> {
        let instances = Instances {
            blocks: instantiate_all(&self.block, diagnostics)?,
            structures: instantiate_all(&self.structure, diagnostics)?,
            items: instantiate_all(&self.item, diagnostics)?,
            recipes: instantiate_all(&self.recipe, diagnostics)?,
            anim_groups: instantiate_all(&self.anim_group, diagnostics)?,
            sprites: instantiate_all(&self.sprite, diagnostics)?,
            attach_slots: instantiate_all(&self.attach_slot, diagnostics)?,
            extras: instantiate_all(&self.extra, diagnostics)?,
            loot_tables: self.loot_tables,
        };
        debug!(
            blocks = instances.blocks.len(),
            structures = instances.structures.len(),
            items = instances.items.len(),
            recipes = instances.recipes.len(),
            "instantiated prototypes"
        );
        Ok(instances)
    }
}

fn instantiate_all<P: Prototype>(
    builder: &Builder<P>,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<P::Output>> {
    let mut out = Vec::with_capacity(builder.len());
    for proto in builder.iter() {
        if let Some(entity) = diagnostics.absorb(proto.instantiate())? {
            out.push(entity);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageNode;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(Kind::from_name("tile"), None);
    }

    #[test]
    fn test_instantiate_skips_invalid() {
        let mut builders = Builders::new();
        builders
            .block
            .root()
            .add("grass")
            .unwrap()
            .shape(BlockShape::Floor)
            .bottom(ImageNode::blank(32, 32));
        builders.block.root().add("broken").unwrap();

        let mut diags = Diagnostics::new();
        let instances = builders.instantiate(&mut diags).unwrap();
        assert_eq!(instances.blocks.len(), 1);
        assert!(diags.saw_error());
        assert!(diags.has_code("missing-field"));
    }
}
