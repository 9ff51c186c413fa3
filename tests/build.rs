//! End-to-end builds over generated game trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use tempfile::{tempdir, TempDir};

use tilegen::builder::BlockShape;
use tilegen::{BuildOptions, BuildSummary, DataModule, ModContext, Pipeline};

struct Game {
    dir: TempDir,
}

impl Game {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/data")).unwrap();
        fs::create_dir_all(dir.path().join("src/assets")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> PathBuf {
        self.root().join("out")
    }

    fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn image(&self, rel: &str, width: u32, height: u32, colour: [u8; 4]) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(width, height, Rgba(colour))
            .save(path)
            .unwrap();
    }

    fn options(&self, mods: &[&str]) -> BuildOptions {
        BuildOptions {
            src_dir: self.root().to_path_buf(),
            output_dir: self.out(),
            mods: mods.iter().map(|m| m.to_string()).collect(),
            cache: Some(self.out().join(".image_cache")),
        }
    }

    fn build(&self) -> BuildSummary {
        let summary = Pipeline::new(self.options(&["outpost"])).run().unwrap();
        assert!(
            !summary.diagnostics.saw_error(),
            "{:#?}",
            summary.diagnostics.iter().collect::<Vec<_>>()
        );
        summary
    }

    fn json(&self, name: &str) -> Json {
        let text = fs::read_to_string(self.out().join(name)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn png(&self, name: &str) -> RgbaImage {
        image::open(self.out().join(name)).unwrap().to_rgba8()
    }
}

const GREEN: [u8; 4] = [40, 160, 40, 255];
const GREY: [u8; 4] = [120, 120, 120, 255];
const BROWN: [u8; 4] = [120, 80, 40, 255];

fn find<'a>(list: &'a Json, name: &str) -> &'a Json {
    list.as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == json!(name))
        .unwrap_or_else(|| panic!("no entry named {}", name))
}

#[test]
fn blocks_share_deduplicated_tiles() {
    let game = Game::new();
    game.image("src/assets/grass.png", 32, 32, GREEN);
    game.write(
        "src/data/blocks.od",
        "\
[block grass]
shape: floor
bottom: \"grass.png\"

[block road]
shape: floor
bottom: \"grass.png\"
",
    );
    game.build();

    let blocks = game.json("blocks_client.json");
    assert_eq!(blocks.as_array().unwrap().len(), 2);
    assert_eq!(blocks[0]["bottom"], json!(1));
    assert_eq!(blocks[1]["bottom"], json!(1));
    assert_eq!(blocks[0]["top"], json!(0));
    assert_eq!(blocks[0]["shape"], json!(BlockShape::Floor.code()));

    let tiles = game.png("tiles.png");
    assert_eq!(tiles.height(), 32);
    assert_eq!(tiles.get_pixel(5, 5).0[3], 0);
    assert_eq!(tiles.get_pixel(32 + 5, 5).0, GREEN);
    assert_eq!(tiles.get_pixel(64 + 5, 5).0[3], 0);

    let server = game.json("blocks_server.json");
    assert_eq!(server, json!([{"name": "grass", "shape": "floor"}, {"name": "road", "shape": "floor"}]));
}

#[test]
fn recipe_from_item_from_structure() {
    let game = Game::new();
    game.image("src/assets/anvil.png", 32, 64, GREY);
    game.image("src/assets/stone.png", 32, 32, GREY);
    game.image("src/assets/wood.png", 32, 32, BROWN);
    game.write(
        "src/data/anvil.od",
        "\
[structure anvil]
image: \"anvil.png\"
shape: solid (1, 1, 1)
layer: 1

[item anvil]
from_structure: anvil

[recipe anvil]
from_item: anvil
station: anvil
input: 10 stone
input: 5 wood
",
    );
    game.write(
        "src/data/materials.od",
        "[item stone]\nicon: \"stone.png\"\n\n[item wood]\nicon: \"wood.png\"\n",
    );
    game.build();

    let items = game.json("items_client.json");
    assert_eq!(items[0], json!({"ui_name": "anvil"}));
    assert_eq!(game.json("items_server.json")[0], json!({"name": "anvil", "ui_name": "anvil"}));
    let recipes = game.json("recipes_client.json");
    assert_eq!(
        recipes,
        json!([{
            "name": "anvil",
            "ui_name": "anvil",
            "station": 0,
            "inputs": {"1": 10, "2": 5},
            "outputs": {"0": 1},
        }])
    );

    // the icon is the structure image fitted into one tile
    let sheet = game.png("items.png");
    assert_eq!(sheet.get_pixel(16, 16).0[3], 255);
    assert_eq!(sheet.get_pixel(1, 16).0[3], 0);
    assert_eq!(sheet.get_pixel(32 + 16, 16).0, GREY);
    assert_eq!(sheet.get_pixel(64 + 16, 16).0, BROWN);

    let structures = game.json("structures_client.json");
    let part = &structures[0]["parts"][0];
    assert_eq!(part["sheet"], json!(0));
    assert_eq!(game.json("structures_list.json"), json!(["anvil"]));
    assert!(game.out().join("structures0.png").is_file());
    assert!(game.out().join("structdepth0.png").is_file());
}

#[test]
fn loot_extensions_merge_weights() {
    let game = Game::new();
    game.image("src/assets/coin.png", 32, 32, [220, 200, 40, 255]);
    game.write(
        "src/data/items.od",
        "[item gold]\nicon: \"coin.png\"\n[item silver]\nicon: \"coin.png\"\n",
    );
    game.write(
        "src/data/treasure.loot",
        "\
[choose_item treasure]
(1) gold
(2) silver

[choose_item_ext treasure]
(3) gold
",
    );
    game.build();

    let extras = game.json("extras_client.json");
    let tables = &extras["loot_tables_item"];
    let items = game.json("items_client.json");
    let item_name = |id: &Json| -> String {
        items[id.as_u64().unwrap() as usize]["ui_name"].as_str().unwrap().to_string()
    };

    let variants = tables[0]["choose"].as_array().unwrap();
    let mut weights = BTreeMap::new();
    for pair in variants {
        let object = &tables[pair[1].as_u64().unwrap() as usize];
        assert_eq!(object["min"], json!(1));
        weights.insert(item_name(&object["object"]), pair[0].as_u64().unwrap());
    }
    assert_eq!(weights, BTreeMap::from([("gold".to_string(), 4), ("silver".to_string(), 2)]));
    assert_eq!(extras["loot_table_ids_item"], json!({"treasure": 0}));
}

#[test]
fn mirrored_animations_share_frames() {
    let game = Game::new();
    let mut src = String::from("[anim_group human]\nframe_size: (32, 48)\n");
    for i in [0, 1, 2, 6, 7] {
        src.push_str(&format!("anim: walk_{} 6 10\n", i));
    }
    src.push_str("mirror: walk_3 walk_5\nmirror: walk_4 walk_2\nmirror: walk_5 walk_1\n");
    game.write("src/data/anims.od", &src);
    game.build();

    let groups = game.json("animations_client.json");
    let anims = &groups[0]["anims"];
    for (slot, source) in [("walk_3", "walk_5"), ("walk_4", "walk_2"), ("walk_5", "walk_1")] {
        let a = find(anims, slot);
        let b = find(anims, source);
        for key in ["sheet", "offset", "length", "framerate"] {
            assert_eq!(a[key], b[key], "{} vs {}: {}", slot, source, key);
        }
        assert_eq!(a["mirror"], json!(!b["mirror"].as_bool().unwrap()));
    }
    assert_eq!(find(anims, "walk_1")["mirror"], json!(false));
}

#[test]
fn cache_tracks_asset_changes() {
    let game = Game::new();
    game.image("src/assets/foo.png", 32, 32, GREEN);
    game.write(
        "src/data/foo.od",
        "[block foo]\nshape: solid\ntop: `load(\"foo.png\").flip()`\n",
    );

    let first = game.build();
    assert!(first.stats.realized > 0);

    // unrelated script edit: everything comes from the disk cache
    game.write("src/data/other.od", "[block bar]\nshape: empty\n");
    let second = game.build();
    assert_eq!(second.stats.realized, 0);
    assert!(second.stats.disk_hits > 0);

    let file = fs::File::options()
        .write(true)
        .open(game.root().join("src/assets/foo.png"))
        .unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    drop(file);
    let third = game.build();
    // the file node and the flipped node behind it
    assert!(third.stats.realized >= 2, "{:?}", third.stats);
}

#[test]
fn builds_are_deterministic() {
    let game = Game::new();
    game.image("src/assets/grass.png", 32, 32, GREEN);
    game.image("src/assets/hut.png", 64, 64, BROWN);
    game.write(
        "src/data/world.od",
        "\
[block grass]
shape: floor
bottom: \"grass.png\"

[structure hut]
shape: solid (2, 1, 1)
image: \"hut.png\"
",
    );

    let run = |out: &str| {
        let mut options = game.options(&["outpost"]);
        options.output_dir = game.root().join(out);
        options.cache = None;
        Pipeline::new(options).run().unwrap()
    };
    let a = run("a");
    let b = run("b");
    assert_eq!(a.emitted.files, b.emitted.files);
    for file in &a.emitted.files {
        // the depfile names its own output directory
        if file == Path::new("data.d") {
            continue;
        }
        let left = fs::read(game.root().join("a").join(file)).unwrap();
        let right = fs::read(game.root().join("b").join(file)).unwrap();
        assert!(left == right, "{} differs", file.display());
    }
}

#[test]
fn errors_are_collected_and_output_still_written() {
    let game = Game::new();
    game.image("src/assets/grass.png", 32, 32, GREEN);
    game.write(
        "src/data/broken.od",
        "\
[tile grass]
shape: floor

[block grass]
shape: floor
bottom: \"missing.png\"

[block grass]
shape: solid

[recipe axe]
station: forge
output: 1 axe
",
    );
    let summary = Pipeline::new(game.options(&["outpost"])).run().unwrap();
    let d = &summary.diagnostics;
    assert!(d.saw_error());
    assert!(d.has_code("unknown-section-type"));
    assert!(d.has_code("asset-not-found"));
    assert!(d.has_code("duplicate-name"));
    assert!(d.has_code("unresolved-reference"));
    assert!(game.out().join("blocks_client.json").is_file());
}

#[test]
fn depfile_lists_scripts_assets_and_probes() {
    let game = Game::new();
    game.image("src/assets/grass.png", 32, 32, GREEN);
    game.write("src/data/blocks.od", "[block grass]\nshape: floor\nbottom: \"grass.png\"\n");
    game.build();

    let depfile = fs::read_to_string(game.out().join("data.d")).unwrap();
    let stamp = game.out().join("stamp");
    assert!(depfile.starts_with(&format!("{}: \\\n", stamp.display())));
    assert!(depfile.ends_with(" \\\n\n"));
    let asset = game.root().join("src/assets/grass.png");
    let script = game.root().join("src/data/blocks.od");
    let data_dir = game.root().join("src/data");
    for dep in [&asset, &script, &data_dir] {
        assert!(
            depfile.contains(&format!("    {} \\\n", dep.display())),
            "{} missing from\n{}",
            dep.display(),
            depfile
        );
    }
    let used = fs::read_to_string(game.out().join("used_assets.txt")).unwrap();
    assert_eq!(used, format!("{}\n", asset.display()));
    assert_eq!(fs::read_to_string(stamp).unwrap(), "");
}

#[test]
fn mods_resolve_assets_through_the_base() {
    let game = Game::new();
    game.image("src/assets/stone.png", 32, 32, GREY);
    game.write("src/mods/tools/data/axe.od", "[item axe]\nicon: \"stone.png\"\n");
    let summary = Pipeline::new(game.options(&["outpost", "tools"])).run().unwrap();
    assert!(!summary.diagnostics.saw_error());
    assert_eq!(find(&game.json("items_server.json"), "axe")["ui_name"], json!("axe"));
}

#[test]
fn bad_mods_are_reported_and_skipped() {
    let game = Game::new();
    game.image("src/assets/stone.png", 32, 32, GREY);
    game.write("src/data/stone.od", "[item stone]\nicon: \"stone.png\"\n");
    game.write("src/mods/tools/data/axe.od", "[item axe]\nicon: \"stone.png\"\n");
    let summary = Pipeline::new(game.options(&["outpost", "ghost", "phantom", "tools"]))
        .run()
        .unwrap();
    let d = &summary.diagnostics;
    assert!(d.saw_error());
    let unknown: Vec<_> = d.iter().filter(|x| x.code == "unknown-mod").collect();
    assert_eq!(unknown.len(), 2);
    let items = game.json("items_server.json");
    assert_eq!(items.as_array().unwrap().len(), 2);
    find(&items, "axe");
}

struct Ores;

impl DataModule for Ores {
    fn name(&self) -> &str {
        "ores"
    }

    fn init(&self, ctx: &mut ModContext<'_>) -> tilegen::Result<()> {
        let stone = ctx.load("stone.png")?;
        ctx.builders()
            .block
            .root()
            .prefixed("ore")
            .add_all(["iron", "copper"])?
            .shape(BlockShape::Solid)
            .top(stone);
        Ok(())
    }
}

#[test]
fn native_modules_run_before_scripts() {
    let game = Game::new();
    game.image("src/assets/stone.png", 32, 32, GREY);
    game.image("src/assets/iron.png", 32, 32, BROWN);
    // scripts can refer to what native modules declared
    game.write(
        "src/data/ores.od",
        "\
%%%
iron = INSTANCES.block[\"ore/iron\"]
ores = INSTANCES.block.names()
%%%
[block deep]
multi_name: `ores`
shape: solid
top: \"iron.png\"
",
    );
    let summary = Pipeline::new(game.options(&["outpost"]))
        .with_module("outpost", Box::new(Ores))
        .run()
        .unwrap();
    assert!(!summary.diagnostics.saw_error(), "{:#?}", summary.diagnostics);
    let names: Vec<Json> = game.json("blocks_server.json").as_array().unwrap().iter().map(|b| b["name"].clone()).collect();
    assert_eq!(
        names,
        vec![
            json!("deep/ore/copper"),
            json!("deep/ore/iron"),
            json!("ore/copper"),
            json!("ore/iron"),
        ]
    );
}
