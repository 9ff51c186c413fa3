//! ID assignment, reference resolution, loot compilation and extras.

mod ids;
mod loot;
mod resolve;

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::builder::{Instances, Kind};
use crate::diagnostics::Diagnostics;

pub use ids::{assign_ids, reserved_names, IdMap, IdMaps, Named};
pub use loot::{compile as compile_loot, compile_all as compile_all_loot, CompiledLoot, LootTables};
pub use resolve::{resolve_refs, AttachRefs, RecipeRefs, Refs, Resolver};

/// What an extra generator can see.
pub struct ExtraInput<'a> {
    pub ids: &'a IdMaps,
    pub instances: &'a Instances,
}

/// Sort every instance list into ID order and return the ID maps.
pub fn assign_all(instances: &mut Instances) -> IdMaps {
    let mut ids = IdMaps::default();
    ids.insert(
        Kind::Block,
        assign_ids(&mut instances.blocks, reserved_names(Kind::Block)),
    );
    ids.insert(
        Kind::Structure,
        assign_ids(&mut instances.structures, reserved_names(Kind::Structure)),
    );
    ids.insert(
        Kind::Item,
        assign_ids(&mut instances.items, reserved_names(Kind::Item)),
    );
    ids.insert(
        Kind::Recipe,
        assign_ids(&mut instances.recipes, reserved_names(Kind::Recipe)),
    );
    ids.insert(
        Kind::AnimGroup,
        assign_ids(&mut instances.anim_groups, reserved_names(Kind::AnimGroup)),
    );
    ids.insert(
        Kind::Sprite,
        assign_ids(&mut instances.sprites, reserved_names(Kind::Sprite)),
    );
    ids.insert(
        Kind::AttachSlot,
        assign_ids(&mut instances.attach_slots, reserved_names(Kind::AttachSlot)),
    );
    ids.insert(
        Kind::Extra,
        assign_ids(&mut instances.extras, reserved_names(Kind::Extra)),
    );
    ids
}

/// Run every extra generator. Failures are reported and the extra skipped.
pub fn generate_extras(
    instances: &Instances,
    ids: &IdMaps,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, Json> {
    let input = ExtraInput { ids, instances };
    let mut out = BTreeMap::new();
    for extra in &instances.extras {
        match extra.generator.generate(&input) {
            Ok(value) => {
                out.insert(extra.name.clone(), value);
            }
            Err(err) => diagnostics.report_at(format!("extra '{}'", extra.name), &err),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Extra, ExtraGen, Item};
    use crate::error::GenError;
    use crate::imaging::ImageNode;
    use serde_json::json;
    use std::rc::Rc;

    fn item(name: &str) -> Item {
        Item {
            name: name.into(),
            display_name: name.into(),
            icon: ImageNode::blank(32, 32),
        }
    }

    #[test]
    fn test_assign_all_orders_lists() {
        let mut instances = Instances {
            items: vec![item("wood"), item("none"), item("axe")],
            ..Default::default()
        };
        let ids = assign_all(&mut instances);
        let names: Vec<&str> = instances.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["none", "axe", "wood"]);
        assert_eq!(ids.of(Kind::Item).get("wood"), Some(2));
    }

    #[test]
    fn test_extras() {
        let mut instances = Instances {
            items: vec![item("axe")],
            extras: vec![
                Extra {
                    name: "item_ids".into(),
                    generator: ExtraGen::Ids(Kind::Item),
                },
                Extra {
                    name: "version".into(),
                    generator: ExtraGen::Value(json!(3)),
                },
                Extra {
                    name: "broken".into(),
                    generator: ExtraGen::Native(Rc::new(|_: &ExtraInput<'_>| {
                        Err(GenError::eval("nope"))
                    })),
                },
            ],
            ..Default::default()
        };
        let ids = assign_all(&mut instances);
        let mut diags = Diagnostics::new();
        let extras = generate_extras(&instances, &ids, &mut diags);
        assert_eq!(extras["item_ids"], json!({"axe": 0}));
        assert_eq!(extras["version"], json!(3));
        assert!(!extras.contains_key("broken"));
        assert!(diags.saw_error());
    }
}
