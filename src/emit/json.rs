//! JSON manifests.
//!
//! Every list is in ID order, so a client entry's index is its ID. Server
//! records refer to other entities by name; client records by ID.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as Json;

use crate::builder::{AnimGroup, AttachSlot, Block, Item, LootObject, Recipe, Sprite, Structure};
use crate::compile::{AttachRefs, LootTables, RecipeRefs};
use crate::error::{GenError, Result};
use crate::pack::{AnimPlacement, GroupLayout};
use crate::process::PartPlacement;

#[derive(Serialize)]
struct Light {
    color: (u8, u8, u8),
    radius: u8,
}

fn light(block: &Block) -> Option<Light> {
    block.light.map(|(color, radius)| Light { color, radius })
}

#[derive(Serialize)]
struct BlockServer<'a> {
    name: &'a str,
    shape: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    light: Option<Light>,
}

#[derive(Serialize)]
struct BlockClient<'a> {
    name: &'a str,
    shape: u8,
    front: u32,
    back: u32,
    top: u32,
    bottom: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    light: Option<Light>,
}

pub fn blocks_server(blocks: &[Block]) -> Result<Json> {
    to_json(blocks.iter().map(|b| BlockServer {
        name: &b.name,
        shape: b.shape.name(),
        light: light(b),
    }))
}

/// `tiles` holds `[front, back, top, bottom]` per block.
pub fn blocks_client(blocks: &[Block], tiles: &[[u32; 4]]) -> Result<Json> {
    to_json(blocks.iter().zip(tiles).map(|(b, &[front, back, top, bottom])| BlockClient {
        name: &b.name,
        shape: b.shape.code(),
        front,
        back,
        top,
        bottom,
        light: light(b),
    }))
}

#[derive(Serialize)]
struct ItemServer<'a> {
    name: &'a str,
    ui_name: &'a str,
}

/// Client items carry no name: a record's position is its ID and its
/// icon is the same cell of `items.png`.
#[derive(Serialize)]
struct ItemClient<'a> {
    ui_name: &'a str,
}

pub fn items_server(items: &[Item]) -> Result<Json> {
    to_json(items.iter().map(|i| ItemServer {
        name: &i.name,
        ui_name: &i.display_name,
    }))
}

pub fn items_client(items: &[Item]) -> Result<Json> {
    to_json(items.iter().map(|i| ItemClient {
        ui_name: &i.display_name,
    }))
}

#[derive(Serialize)]
struct RecipeServer<'a> {
    name: &'a str,
    ui_name: &'a str,
    station: &'a str,
    inputs: &'a BTreeMap<String, u32>,
    outputs: &'a BTreeMap<String, u32>,
}

#[derive(Serialize)]
struct RecipeClient<'a> {
    name: &'a str,
    ui_name: &'a str,
    station: Option<u32>,
    inputs: BTreeMap<u32, u32>,
    outputs: BTreeMap<u32, u32>,
}

pub fn recipes_server(recipes: &[Recipe]) -> Result<Json> {
    to_json(recipes.iter().map(|r| RecipeServer {
        name: &r.name,
        ui_name: &r.display_name,
        station: &r.station,
        inputs: &r.inputs,
        outputs: &r.outputs,
    }))
}

pub fn recipes_client(recipes: &[Recipe], refs: &[RecipeRefs]) -> Result<Json> {
    // unresolved IDs were reported during resolution
    fn counts(pairs: &[(Option<u32>, u32)]) -> BTreeMap<u32, u32> {
        pairs.iter().filter_map(|&(id, n)| id.map(|id| (id, n))).collect()
    }
    to_json(recipes.iter().zip(refs).map(|(r, refs)| RecipeClient {
        name: &r.name,
        ui_name: &r.display_name,
        station: refs.station,
        inputs: counts(&refs.inputs),
        outputs: counts(&refs.outputs),
    }))
}

#[derive(Serialize)]
struct StructureServer<'a> {
    name: &'a str,
    size: (u32, u32, u32),
    shape: Vec<&'static str>,
    layer: u8,
}

#[derive(Serialize)]
struct StructureClient<'a> {
    name: &'a str,
    size: (u32, u32, u32),
    shape: Vec<u8>,
    layer: u8,
    parts: &'a [PartPlacement],
}

pub fn structures_server(structures: &[Structure]) -> Result<Json> {
    to_json(structures.iter().map(|s| StructureServer {
        name: &s.name,
        size: s.size(),
        shape: s.shape.cells.iter().map(|c| c.name()).collect(),
        layer: s.layer,
    }))
}

pub fn structures_client(structures: &[Structure], parts: &[Vec<PartPlacement>]) -> Result<Json> {
    to_json(structures.iter().zip(parts).map(|(s, parts)| StructureClient {
        name: &s.name,
        size: s.size(),
        shape: s.shape.codes(),
        layer: s.layer,
        parts,
    }))
}

pub fn structures_list(structures: &[Structure]) -> Result<Json> {
    to_json(structures.iter().map(|s| s.name.as_str()))
}

#[derive(Serialize)]
struct SlotServer<'a> {
    name: &'a str,
    length: u32,
    framerate: u32,
    oneshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirror_of: Option<&'a str>,
}

#[derive(Serialize)]
struct AnimGroupServer<'a> {
    name: &'a str,
    frame_size: (u32, u32),
    anims: Vec<SlotServer<'a>>,
}

#[derive(Serialize)]
struct AnimGroupClient<'a> {
    name: &'a str,
    frame_size: (u32, u32),
    sheet_sizes: &'a [(u32, u32)],
    anims: &'a [AnimPlacement],
}

pub fn animations_server(groups: &[AnimGroup]) -> Result<Json> {
    to_json(groups.iter().map(|g| AnimGroupServer {
        name: &g.name,
        frame_size: g.frame_size,
        anims: g
            .slots
            .iter()
            .map(|s| SlotServer {
                name: &s.name,
                length: s.length,
                framerate: s.framerate,
                oneshot: s.oneshot,
                mirror_of: s.mirror_of.as_deref(),
            })
            .collect(),
    }))
}

/// Groups whose layout failed are written without sheets or anims.
pub fn animations_client(groups: &[AnimGroup], layouts: &[Option<GroupLayout>]) -> Result<Json> {
    to_json(groups.iter().zip(layouts).map(|(g, layout)| AnimGroupClient {
        name: &g.name,
        frame_size: g.frame_size,
        sheet_sizes: layout.as_ref().map_or(&[][..], |l| l.sheet_sizes.as_slice()),
        anims: layout.as_ref().map_or(&[][..], |l| l.anims.as_slice()),
    }))
}

#[derive(Serialize)]
struct AttachSlotServer<'a> {
    name: &'a str,
    group: &'a str,
    variants: BTreeMap<&'a str, Option<&'a str>>,
}

#[derive(Serialize)]
struct AttachSlotClient<'a> {
    name: &'a str,
    group: Option<u32>,
    variants: &'a [String],
    /// Sprite ID per variant ID.
    sprites: &'a [Option<u32>],
}

pub fn attach_slots_server(slots: &[AttachSlot]) -> Result<Json> {
    to_json(slots.iter().map(|s| AttachSlotServer {
        name: &s.name,
        group: &s.group,
        variants: s
            .variants
            .iter()
            .map(|(v, sprite)| (v.as_str(), sprite.as_deref()))
            .collect(),
    }))
}

pub fn attach_slots_client(slots: &[AttachSlot], refs: &[AttachRefs]) -> Result<Json> {
    to_json(slots.iter().zip(refs).map(|(s, refs)| AttachSlotClient {
        name: &s.name,
        group: refs.group,
        variants: refs.variants.names(),
        sprites: &refs.sprites,
    }))
}

#[derive(Serialize)]
struct SpriteRecord<'a> {
    name: &'a str,
    group: Option<u32>,
    sheets: Vec<String>,
}

/// File name of one of a sprite's sheets, relative to the output directory.
pub fn sprite_file(name: &str, index: usize) -> String {
    format!("sprites/{}-{}.png", name.replace('/', "_"), index)
}

pub fn sprites_list(sprites: &[Sprite], groups: &[Option<u32>]) -> Result<Json> {
    to_json(sprites.iter().zip(groups).map(|(s, &group)| SpriteRecord {
        name: &s.name,
        group,
        sheets: (0..s.images.len()).map(|i| sprite_file(&s.name, i)).collect(),
    }))
}

/// Generated extras plus the compiled loot tables.
pub fn extras_client(extras: &BTreeMap<String, Json>, loot: &BTreeMap<LootObject, LootTables>) -> Json {
    let mut out: serde_json::Map<String, Json> = extras.clone().into_iter().collect();
    for (object, tables) in loot {
        out.insert(format!("loot_tables_{}", object.name()), tables.to_json());
        out.insert(format!("loot_table_ids_{}", object.name()), tables.table_ids.to_json());
    }
    Json::Object(out)
}

fn to_json<T: Serialize>(records: impl Iterator<Item = T>) -> Result<Json> {
    let records: Vec<T> = records.collect();
    serde_json::to_value(records).map_err(|e| GenError::Build {
        message: format!("Failed to serialize manifest: {}", e),
        help: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{AnimSlot, BlockShape, ShapeGrid};
    use crate::imaging::ImageNode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_blocks() {
        let blocks = vec![
            Block {
                name: "empty".into(),
                shape: BlockShape::Empty,
                sides: [None, None, None, None],
                light: None,
            },
            Block {
                name: "torch".into(),
                shape: BlockShape::Floor,
                sides: [None, None, None, Some(ImageNode::blank(32, 32))],
                light: Some(((255, 200, 100), 4)),
            },
        ];
        assert_eq!(
            blocks_server(&blocks).unwrap(),
            json!([
                {"name": "empty", "shape": "empty"},
                {"name": "torch", "shape": "floor", "light": {"color": [255, 200, 100], "radius": 4}},
            ])
        );
        let client = blocks_client(&blocks, &[[0, 0, 0, 0], [0, 0, 0, 1]]).unwrap();
        assert_eq!(client[1]["bottom"], json!(1));
        assert_eq!(client[1]["shape"], json!(BlockShape::Floor.code()));
    }

    #[test]
    fn test_items_client_drops_names() {
        let items = vec![Item {
            name: "tools/axe".into(),
            display_name: "Axe".into(),
            icon: ImageNode::blank(32, 32),
        }];
        assert_eq!(
            items_server(&items).unwrap(),
            json!([{"name": "tools/axe", "ui_name": "Axe"}])
        );
        assert_eq!(items_client(&items).unwrap(), json!([{"ui_name": "Axe"}]));
    }

    #[test]
    fn test_recipe_ids_key_counts() {
        let mut inputs = BTreeMap::new();
        inputs.insert("stone".to_string(), 10);
        inputs.insert("wood".to_string(), 5);
        let recipe = Recipe {
            name: "anvil".into(),
            display_name: "anvil".into(),
            station: "anvil".into(),
            inputs,
            outputs: BTreeMap::from([("anvil".to_string(), 1)]),
        };
        let refs = RecipeRefs {
            station: Some(3),
            inputs: vec![(Some(7), 10), (Some(9), 5)],
            outputs: vec![(Some(1), 1)],
        };
        assert_eq!(
            recipes_client(&[recipe.clone()], &[refs]).unwrap(),
            json!([{
                "name": "anvil",
                "ui_name": "anvil",
                "station": 3,
                "inputs": {"7": 10, "9": 5},
                "outputs": {"1": 1},
            }])
        );
        assert_eq!(recipes_server(&[recipe]).unwrap()[0]["inputs"], json!({"stone": 10, "wood": 5}));
    }

    #[test]
    fn test_structures() {
        let s = Structure {
            name: "anvil".into(),
            shape: ShapeGrid::filled(BlockShape::Solid, (1, 1, 1)),
            layer: 1,
            parts: Vec::new(),
        };
        let server = structures_server(&[s.clone()]).unwrap();
        assert_eq!(server[0]["shape"], json!(["solid"]));
        assert_eq!(structures_list(&[s.clone()]).unwrap(), json!(["anvil"]));
        let client = structures_client(&[s], &[Vec::new()]).unwrap();
        assert_eq!(client[0]["parts"], json!([]));
    }

    #[test]
    fn test_animations_without_layout() {
        let group = AnimGroup {
            name: "human".into(),
            frame_size: (96, 96),
            page_cells: (16, 16),
            slots: vec![AnimSlot {
                name: "walk-0".into(),
                length: 6,
                framerate: 10,
                oneshot: false,
                mirror_of: None,
            }],
        };
        let server = animations_server(&[group.clone()]).unwrap();
        assert_eq!(server[0]["anims"][0]["name"], json!("walk-0"));
        assert!(server[0]["anims"][0].get("mirror_of").is_none());
        let client = animations_client(&[group], &[None]).unwrap();
        assert_eq!(client[0]["anims"], json!([]));
    }

    #[test]
    fn test_sprite_file_names() {
        assert_eq!(sprite_file("human/hat", 1), "sprites/human_hat-1.png");
        let sprite = Sprite {
            name: "human/base".into(),
            group: "human".into(),
            images: vec![ImageNode::blank(32, 32)],
        };
        assert_eq!(
            sprites_list(&[sprite], &[Some(0)]).unwrap(),
            json!([{"name": "human/base", "group": 0, "sheets": ["sprites/human_base-0.png"]}])
        );
    }

    #[test]
    fn test_extras_include_loot() {
        let mut loot = BTreeMap::new();
        loot.insert(LootObject::Item, LootTables::default());
        let extras = BTreeMap::from([("version".to_string(), json!(3))]);
        let out = extras_client(&extras, &loot);
        assert_eq!(out["version"], json!(3));
        assert_eq!(out["loot_tables_item"], json!([]));
    }
}
