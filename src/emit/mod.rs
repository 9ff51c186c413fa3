//! Writing the output directory.

pub mod json;

mod depfile;
mod png;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde_json::Value as Json;
use tracing::{debug, info_span};

use crate::builder::{Instances, LootObject};
use crate::compile::{LootTables, Refs};
use crate::error::{GenError, Result};
use crate::process::Processed;

pub use depfile::render_depfile;
pub use png::write_png;

/// Name of the empty stamp file the depfile's rule targets.
pub const STAMP: &str = "stamp";

/// Everything computed by the pipeline that ends up on disk.
pub struct BuildOutput<'a> {
    pub instances: &'a Instances,
    pub refs: &'a Refs,
    pub loot: &'a BTreeMap<LootObject, LootTables>,
    pub extras: &'a BTreeMap<String, Json>,
    pub processed: &'a Processed,
}

/// Files written, relative to the output directory, in write order.
#[derive(Debug, Default)]
pub struct Emitted {
    pub files: Vec<PathBuf>,
}

struct Emitter<'a> {
    out_dir: &'a Path,
    emitted: Emitted,
}

impl Emitter<'_> {
    fn path(&mut self, name: &str) -> PathBuf {
        self.emitted.files.push(PathBuf::from(name));
        self.out_dir.join(name)
    }

    fn json(&mut self, name: &str, value: &Json) -> Result<()> {
        let text = serde_json::to_string(value).map_err(|e| GenError::Build {
            message: format!("Failed to serialize {}: {}", name, e),
            help: None,
        })?;
        self.text(name, &text)
    }

    fn text(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.path(name);
        fs::write(&path, contents).map_err(|e| GenError::Io {
            path,
            message: format!("Failed to write file: {}", e),
        })
    }

    fn png(&mut self, name: &str, img: &RgbaImage) -> Result<()> {
        let path = self.path(name);
        write_png(img, &path)
    }

    fn sheets(&mut self, prefix: &str, sheets: &[RgbaImage]) -> Result<()> {
        for (i, sheet) in sheets.iter().enumerate() {
            self.png(&format!("{}{}.png", prefix, i), sheet)?;
        }
        Ok(())
    }
}

/// Write sheets and manifests, then `used_assets.txt`, the stamp and
/// `data.d`.
pub fn emit(
    out_dir: &Path,
    output: &BuildOutput<'_>,
    used_assets: &[PathBuf],
    deps: &BTreeSet<PathBuf>,
) -> Result<Emitted> {
    let _span = info_span!("emit", out_dir = %out_dir.display()).entered();
    fs::create_dir_all(out_dir).map_err(|e| GenError::Io {
        path: out_dir.to_path_buf(),
        message: format!("Failed to create output directory: {}", e),
    })?;
    let mut e = Emitter {
        out_dir,
        emitted: Emitted::default(),
    };
    let inst = output.instances;
    let processed = output.processed;
    let refs = output.refs;

    e.png("tiles.png", &processed.tiles)?;
    e.png("items.png", &processed.items)?;
    e.sheets("structures", &processed.structures.colour)?;
    e.sheets("structdepth", &processed.structures.depth)?;
    e.sheets("staticanim", &processed.structures.anim_colour)?;
    e.sheets("staticanimdepth", &processed.structures.anim_depth)?;
    for (sprite, sheets) in inst.sprites.iter().zip(&processed.sprites) {
        for (i, sheet) in sheets.iter().enumerate() {
            e.png(&json::sprite_file(&sprite.name, i), sheet)?;
        }
    }

    e.json("blocks_server.json", &json::blocks_server(&inst.blocks)?)?;
    e.json(
        "blocks_client.json",
        &json::blocks_client(&inst.blocks, &processed.block_tiles)?,
    )?;
    e.json("items_server.json", &json::items_server(&inst.items)?)?;
    e.json("items_client.json", &json::items_client(&inst.items)?)?;
    e.json("recipes_server.json", &json::recipes_server(&inst.recipes)?)?;
    e.json(
        "recipes_client.json",
        &json::recipes_client(&inst.recipes, &refs.recipes)?,
    )?;
    e.json(
        "structures_server.json",
        &json::structures_server(&inst.structures)?,
    )?;
    e.json(
        "structures_client.json",
        &json::structures_client(&inst.structures, &processed.structures.parts)?,
    )?;
    e.json(
        "animations_server.json",
        &json::animations_server(&inst.anim_groups)?,
    )?;
    e.json(
        "animations_client.json",
        &json::animations_client(&inst.anim_groups, &processed.anim_layouts)?,
    )?;
    e.json(
        "attach_slots_server.json",
        &json::attach_slots_server(&inst.attach_slots)?,
    )?;
    e.json(
        "attach_slots_client.json",
        &json::attach_slots_client(&inst.attach_slots, &refs.attach_slots)?,
    )?;
    e.json(
        "sprites_list.json",
        &json::sprites_list(&inst.sprites, &refs.sprite_groups)?,
    )?;
    e.json("structures_list.json", &json::structures_list(&inst.structures)?)?;
    e.json(
        "extras_client.json",
        &json::extras_client(output.extras, output.loot),
    )?;

    let mut used = String::new();
    for path in used_assets {
        used.push_str(&path.display().to_string());
        used.push('\n');
    }
    e.text("used_assets.txt", &used)?;
    e.text(STAMP, "")?;
    let depfile = render_depfile(&out_dir.join(STAMP), deps);
    e.text("data.d", &depfile)?;

    debug!(files = e.emitted.files.len(), "emitted");
    Ok(e.emitted)
}
