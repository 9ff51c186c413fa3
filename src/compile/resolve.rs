//! Name-to-ID reference resolution.
//!
//! Runs after IDs are assigned. A name missing from its kind's ID map is
//! reported and left as `None`; nothing falls back to a default ID.

use crate::builder::{Instances, Kind, NO_ATTACHMENT};
use crate::diagnostics::Diagnostics;
use crate::error::GenError;

use super::ids::{assign_ids, reserved_names, IdMap, IdMaps};

/// Looks names up and reports misses.
pub struct Resolver<'a> {
    ids: &'a IdMaps,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    pub fn new(ids: &'a IdMaps, diagnostics: &'a mut Diagnostics) -> Self {
        Self { ids, diagnostics }
    }

    pub fn lookup(&mut self, kind: Kind, name: &str, context: &str) -> Option<u32> {
        lookup_in(self.ids.of(kind), kind.name(), name, context, self.diagnostics)
    }
}

fn lookup_in(
    map: &IdMap,
    kind: &'static str,
    name: &str,
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Option<u32> {
    let id = map.get(name);
    if id.is_none() {
        diagnostics.report(&GenError::UnresolvedReference {
            context: context.to_string(),
            kind,
            name: name.to_string(),
        });
    }
    id
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRefs {
    pub station: Option<u32>,
    pub inputs: Vec<(Option<u32>, u32)>,
    pub outputs: Vec<(Option<u32>, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRefs {
    pub group: Option<u32>,
    /// Variant IDs within the slot; `none` is 0.
    pub variants: IdMap,
    /// Sprite ID per variant ID.
    pub sprites: Vec<Option<u32>>,
}

/// Resolved references, indexed like the (ID-ordered) instance lists.
#[derive(Debug, Clone, Default)]
pub struct Refs {
    pub recipes: Vec<RecipeRefs>,
    pub sprite_groups: Vec<Option<u32>>,
    pub attach_slots: Vec<AttachRefs>,
}

pub fn resolve_refs(instances: &Instances, ids: &IdMaps, diagnostics: &mut Diagnostics) -> Refs {
    let mut resolver = Resolver::new(ids, diagnostics);

    let recipes = instances
        .recipes
        .iter()
        .map(|recipe| {
            let context = format!("recipe '{}'", recipe.name);
            let mut counts = |kind, map: &std::collections::BTreeMap<String, u32>| {
                map.iter()
                    .map(|(name, &count)| (resolver.lookup(kind, name, &context), count))
                    .collect::<Vec<_>>()
            };
            let inputs = counts(Kind::Item, &recipe.inputs);
            let outputs = counts(Kind::Item, &recipe.outputs);
            RecipeRefs {
                station: resolver.lookup(Kind::Structure, &recipe.station, &context),
                inputs,
                outputs,
            }
        })
        .collect();

    let sprite_groups = instances
        .sprites
        .iter()
        .map(|sprite| {
            resolver.lookup(
                Kind::AnimGroup,
                &sprite.group,
                &format!("sprite '{}'", sprite.name),
            )
        })
        .collect();

    let attach_slots = instances
        .attach_slots
        .iter()
        .map(|slot| {
            let context = format!("attach slot '{}'", slot.name);
            let mut variants = slot.variants.clone();
            let variant_ids = assign_ids(&mut variants, reserved_names(Kind::AttachSlot));
            debug_assert_eq!(variant_ids.get(NO_ATTACHMENT), Some(0));
            let sprites = variants
                .iter()
                .map(|(_, sprite)| {
                    sprite
                        .as_ref()
                        .and_then(|s| resolver.lookup(Kind::Sprite, s, &context))
                })
                .collect();
            AttachRefs {
                group: resolver.lookup(Kind::AnimGroup, &slot.group, &context),
                variants: variant_ids,
                sprites,
            }
        })
        .collect();

    Refs {
        recipes,
        sprite_groups,
        attach_slots,
    }
}
