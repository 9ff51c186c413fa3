//! Data-directory scanning.
//!
//! A data directory is a package. Its children load in the order given by
//! an optional `index.yaml`, otherwise sorted by name. `.od` files are
//! section scripts, `.loot` files loot scripts, and sub-directories are
//! packages loaded recursively.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::GenError;

use super::manifest::PackageIndex;
use super::INDEX_FILENAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Section,
    Loot,
}

/// One script to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub path: PathBuf,
    pub kind: ScriptKind,
    /// Slash-separated module name relative to the data directory.
    pub module: String,
}

/// Scripts in load order, plus every directory and index file read.
#[derive(Debug, Default)]
pub struct Scan {
    pub scripts: Vec<ScriptFile>,
    pub deps: Vec<PathBuf>,
}

pub fn detect_script_kind(path: &Path) -> Option<ScriptKind> {
    match path.extension()?.to_str()? {
        "od" => Some(ScriptKind::Section),
        "loot" => Some(ScriptKind::Loot),
        _ => None,
    }
}

/// Scan a data directory. A missing directory is an empty package.
pub fn scan_data_dir(dir: &Path, diagnostics: &mut Diagnostics) -> Scan {
    let mut scan = Scan::default();
    if dir.is_dir() {
        scan_package(dir, "", &mut scan, diagnostics);
    }
    scan
}

fn scan_package(dir: &Path, prefix: &str, scan: &mut Scan, diagnostics: &mut Diagnostics) {
    scan.deps.push(dir.to_path_buf());
    let index_path = dir.join(INDEX_FILENAME);
    let children = if index_path.is_file() {
        scan.deps.push(index_path.clone());
        match PackageIndex::load(&index_path) {
            Ok(index) => {
                let listed = indexed_children(dir, &index, diagnostics);
                warn_unlisted(dir, &listed, diagnostics);
                listed
            }
            Err(err) => {
                diagnostics.report_at(index_path.display().to_string(), &err);
                Vec::new()
            }
        }
    } else {
        sorted_children(dir)
    };

    for path in children {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let module = if prefix.is_empty() {
            stem.to_string()
        } else {
            format!("{}/{}", prefix, stem)
        };
        if path.is_dir() {
            scan_package(&path, &module, scan, diagnostics);
        } else if let Some(kind) = detect_script_kind(&path) {
            scan.scripts.push(ScriptFile { path, kind, module });
        }
    }
}

/// Scripts sitting next to an index that does not name them are not loaded.
fn warn_unlisted(dir: &Path, listed: &[PathBuf], diagnostics: &mut Diagnostics) {
    for path in sorted_children(dir) {
        if path.is_file() && !listed.contains(&path) {
            diagnostics.push(
                Diagnostic::warning(
                    "unlisted-script",
                    format!("{} is not listed in {} and was skipped", path.display(), INDEX_FILENAME),
                )
                .with_help(format!("add it to `modules` in {}", dir.join(INDEX_FILENAME).display())),
            );
        }
    }
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_dir() || detect_script_kind(p).is_some())
        .collect()
}

/// Children named by the index. Each name may be a script of either kind
/// (both load, section script first) or a sub-package.
fn indexed_children(dir: &Path, index: &PackageIndex, diagnostics: &mut Diagnostics) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for name in &index.modules {
        let candidates = [
            dir.join(format!("{}.od", name)),
            dir.join(format!("{}.loot", name)),
            dir.join(name),
        ];
        let found: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|p| if p.extension().is_some() { p.is_file() } else { p.is_dir() })
            .collect();
        if found.is_empty() {
            diagnostics.report_at(
                dir.join(INDEX_FILENAME).display().to_string(),
                &GenError::Config {
                    message: format!("index lists '{}', which is not a script or package", name),
                    help: None,
                },
            );
        }
        out.extend(found);
    }
    out
}
