//! Mod discovery, registration and asset resolution.
//!
//! ```ignore
//! let mut mods = ModRegistry::from_names(&src_dir, &["outpost".into(), "tools".into()], &mut diagnostics)?;
//! let path = mods.resolve("tools", "items/axe.png")?;
//! ```

mod manifest;
mod registry;
mod scanner;

pub use manifest::{ModManifest, PackageIndex};
pub use registry::{Mod, ModRegistry};
pub use scanner::{detect_script_kind, scan_data_dir, Scan, ScriptFile, ScriptKind};

/// Per-mod manifest at the mod root.
pub const MANIFEST_FILENAME: &str = "mod.yaml";

/// Optional load-order file in a data directory.
pub const INDEX_FILENAME: &str = "index.yaml";
