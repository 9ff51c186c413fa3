//! tilegen - content compiler for a tile-based game
//!
//! Data modules (section scripts, loot scripts and native Rust modules)
//! declare blocks, structures, items, recipes, animation groups, sprites and
//! loot tables. The pipeline validates them, assigns stable IDs, resolves
//! references, packs images into sheets and writes ID-addressed manifests.

pub mod builder;
pub mod cli;
pub mod compile;
pub mod context;
pub mod diagnostics;
pub mod dsl;
pub mod emit;
pub mod error;
pub mod imaging;
pub mod mods;
pub mod output;
pub mod pack;
pub mod pipeline;
pub mod process;

pub use builder::{Builders, Instances, Kind};
pub use context::{DataModule, ModContext, PipelineContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{GenError, Result};
pub use pipeline::{BuildOptions, BuildSummary, Pipeline};
