//! Mod manifest (`mod.yaml`) and package index (`index.yaml`) parsing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Per-mod configuration loaded from `mod.yaml` at the mod root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModManifest {
    /// Mods this one depends on, besides the base mod.
    pub depends: Vec<String>,

    /// Asset directories, relative to the mod root, searched before the
    /// mod's own asset directory.
    pub overrides: Vec<String>,
}

impl ModManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read(path, "manifest")?;
        Self::parse(&content).map_err(|e| with_path(e, path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| GenError::Config {
            message: format!("Invalid mod manifest: {}", e),
            help: Some("mod.yaml accepts `depends` and `overrides` lists".to_string()),
        })
    }
}

/// Explicit load order for a data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageIndex {
    /// Script stems or sub-directory names, in load order.
    pub modules: Vec<String>,
}

impl PackageIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read(path, "package index")?;
        Self::parse(&content).map_err(|e| with_path(e, path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| GenError::Config {
            message: format!("Invalid package index: {}", e),
            help: Some("index.yaml accepts a `modules` list".to_string()),
        })
    }
}

fn read(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| GenError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read {}: {}", what, e),
    })
}

fn with_path(err: GenError, path: &Path) -> GenError {
    match err {
        GenError::Config { message, help } => GenError::Config {
            message: format!("{}: {}", path.display(), message),
            help,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let m = ModManifest::parse("depends: [tools]\noverrides:\n  - retro\n").unwrap();
        assert_eq!(m.depends, vec!["tools"]);
        assert_eq!(m.overrides, vec!["retro"]);
    }

    #[test]
    fn test_empty_manifest_is_default() {
        assert_eq!(ModManifest::parse("{}").unwrap(), ModManifest::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ModManifest::parse("depend: [tools]").unwrap_err();
        assert_eq!(err.code(), "config");
    }

    #[test]
    fn test_parse_index() {
        let idx = PackageIndex::parse("modules: [terrain, structures, loot]").unwrap();
        assert_eq!(idx.modules, vec!["terrain", "structures", "loot"]);
    }
}
