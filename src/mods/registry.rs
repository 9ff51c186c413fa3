//! Mod registration and asset-path resolution.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::diagnostics::Diagnostics;
use crate::error::{GenError, Result};

use super::manifest::ModManifest;
use super::MANIFEST_FILENAME;

/// A registered mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mod {
    pub name: String,
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub asset_dir: PathBuf,
    pub override_dirs: Vec<PathBuf>,
    pub deps: Vec<String>,
}

impl Mod {
    /// Mod directories under `src_dir`: the base mod lives in `src/`,
    /// others in `src/mods/<name>/`.
    pub fn locate(src_dir: &Path, name: &str, is_base: bool) -> Result<Self> {
        let root = if is_base {
            src_dir.join("src")
        } else {
            src_dir.join("src").join("mods").join(name)
        };
        if !root.is_dir() {
            return Err(GenError::UnknownMod {
                name: name.to_string(),
            });
        }
        let manifest_path = root.join(MANIFEST_FILENAME);
        let manifest = if manifest_path.is_file() {
            ModManifest::load(&manifest_path)?
        } else {
            ModManifest::default()
        };
        Ok(Self {
            name: name.to_string(),
            data_dir: root.join("data"),
            asset_dir: root.join("assets"),
            override_dirs: manifest.overrides.iter().map(|d| root.join(d)).collect(),
            deps: manifest.depends,
            root,
        })
    }
}

/// Registered mods in dependency order, plus every path probed while
/// resolving assets.
#[derive(Debug, Default)]
pub struct ModRegistry {
    mods: Vec<Mod>,
    index: HashMap<String, usize>,
    probed: BTreeSet<PathBuf>,
}

impl ModRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `--mods` list. The first name is the base mod; every
    /// other mod implicitly depends on it.
    ///
    /// A mod that cannot be located or whose dependencies are missing is
    /// reported and skipped, and so is everything depending on it.
    pub fn from_names(
        src_dir: &Path,
        names: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let mut registry = Self::new();
        let base = names.first().ok_or_else(|| GenError::Config {
            message: "no mods given".to_string(),
            help: Some("Pass the base mod first, e.g. --mods outpost".to_string()),
        })?;
        let mut seen = BTreeSet::new();
        for (i, name) in names.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                diagnostics.report(&GenError::DuplicateMod { name: name.clone() });
                continue;
            }
            let added = registry.add_named(src_dir, name, base, i == 0);
            diagnostics.absorb(added)?;
        }
        Ok(registry)
    }

    fn add_named(&mut self, src_dir: &Path, name: &str, base: &str, is_base: bool) -> Result<()> {
        let mut m = Mod::locate(src_dir, name, is_base)?;
        if !is_base && !m.deps.iter().any(|d| d.as_str() == base) {
            m.deps.insert(0, base.to_string());
        }
        self.probe(&m.root.join(MANIFEST_FILENAME));
        self.register(m)
    }

    /// Add a mod. All of its dependencies must already be registered.
    pub fn register(&mut self, m: Mod) -> Result<()> {
        if self.index.contains_key(&m.name) {
            return Err(GenError::DuplicateMod { name: m.name });
        }
        if let Some(dep) = m.deps.iter().find(|d| !self.index.contains_key(*d)) {
            return Err(GenError::MissingDep {
                name: m.name.clone(),
                dep: dep.clone(),
            });
        }
        debug!(name = %m.name, deps = ?m.deps, "registered mod");
        self.index.insert(m.name.clone(), self.mods.len());
        self.mods.push(m);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Mod> {
        self.index.get(name).map(|&i| &self.mods[i])
    }

    /// Mods in registration order, which is a dependency order.
    pub fn mods(&self) -> &[Mod] {
        &self.mods
    }

    /// Asset directories searched for `name`: its overrides, its own asset
    /// directory, then each transitive dependency's overrides and asset
    /// directory, most recently registered first.
    pub fn search_dirs(&self, name: &str) -> Vec<PathBuf> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };
        let mut reached = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if reached.insert(i) {
                stack.extend(self.mods[i].deps.iter().filter_map(|d| self.index.get(d).copied()));
            }
        }
        reached.remove(&start);

        let mut order = vec![start];
        order.extend(reached.into_iter().rev());
        order
            .into_iter()
            .flat_map(|i| {
                let m = &self.mods[i];
                m.override_dirs.iter().cloned().chain([m.asset_dir.clone()])
            })
            .collect()
    }

    /// Find `path` for mod `module`. Every candidate looked at is recorded:
    /// the file when it exists, otherwise its nearest existing ancestor
    /// directory, so that adding the file later is noticed.
    pub fn resolve(&mut self, module: &str, path: &str) -> Result<PathBuf> {
        for dir in self.search_dirs(module) {
            let candidate = dir.join(path);
            self.probe(&candidate);
            if candidate.is_file() {
                trace!(module, path, found = %candidate.display(), "resolved asset");
                return Ok(candidate);
            }
        }
        Err(GenError::AssetNotFound {
            module: module.to_string(),
            path: path.to_string(),
        })
    }

    /// Record a probed path (or its nearest existing ancestor).
    pub fn probe(&mut self, path: &Path) {
        let mut cursor = Some(path);
        while let Some(p) = cursor {
            if p.exists() {
                self.probed.insert(p.to_path_buf());
                return;
            }
            cursor = p.parent().filter(|parent| !parent.as_os_str().is_empty());
        }
    }

    /// Every file and directory probed so far, sorted.
    pub fn probed(&self) -> impl Iterator<Item = &Path> {
        self.probed.iter().map(PathBuf::as_path)
    }
}
