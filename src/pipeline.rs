//! The whole build: load mods, run data modules, instantiate, assign IDs,
//! resolve, compile loot, process images and emit.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, info, info_span};

use crate::builder::Kind;
use crate::compile::{assign_all, compile_all_loot, generate_extras, resolve_refs};
use crate::context::{DataModule, PipelineContext};
use crate::diagnostics::Diagnostics;
use crate::dsl;
use crate::emit::{emit, BuildOutput, Emitted};
use crate::error::Result;
use crate::imaging::{CacheStats, ImageCache};
use crate::mods::{scan_data_dir, ModRegistry};
use crate::process::process_all;

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Repository root; mods live under `src/`.
    pub src_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Load order; the first is the base game.
    pub mods: Vec<String>,
    /// On-disk image cache, or `None` to run without one.
    pub cache: Option<PathBuf>,
}

/// Outcome of a build that ran to completion. Check
/// `diagnostics.saw_error()` before trusting the output.
#[derive(Debug)]
pub struct BuildSummary {
    pub diagnostics: Diagnostics,
    pub stats: CacheStats,
    pub emitted: Emitted,
    pub counts: Vec<(Kind, usize)>,
}

/// A configured build. Native data modules are registered per mod and run
/// before that mod's scripts.
pub struct Pipeline {
    options: BuildOptions,
    modules: HashMap<String, Vec<Box<dyn DataModule>>>,
}

impl Pipeline {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            modules: HashMap::new(),
        }
    }

    /// Register a native module for `mod_name`.
    pub fn with_module(mut self, mod_name: &str, module: Box<dyn DataModule>) -> Self {
        self.modules
            .entry(mod_name.to_string())
            .or_default()
            .push(module);
        self
    }

    /// Run every phase. Fatal errors abort with `Err`; everything else is
    /// collected in the summary's diagnostics and the build carries on.
    pub fn run(self) -> Result<BuildSummary> {
        let options = &self.options;
        let mut diagnostics = Diagnostics::new();
        let mods = ModRegistry::from_names(&options.src_dir, &options.mods, &mut diagnostics)?;
        let cache = match &options.cache {
            Some(path) => ImageCache::load(path)?,
            None => ImageCache::new(),
        };
        let mut ctx = PipelineContext::new(mods, cache);
        ctx.diagnostics = diagnostics;
        let mut deps: BTreeSet<PathBuf> = BTreeSet::new();

        {
            let _span = info_span!("load").entered();
            let loaded: Vec<(String, PathBuf, PathBuf)> = ctx
                .mods
                .mods()
                .iter()
                .map(|m| (m.name.clone(), m.root.clone(), m.data_dir.clone()))
                .collect();
            for (name, root, data_dir) in loaded {
                deps.insert(root);
                for module in self.modules.get(&name).into_iter().flatten() {
                    debug!(module = module.name(), mod_name = %name, "running native module");
                    let result = module.init(&mut ctx.for_mod(&name));
                    ctx.diagnostics.absorb(result)?;
                }
                let scan = scan_data_dir(&data_dir, &mut ctx.diagnostics);
                deps.extend(scan.deps);
                for script in &scan.scripts {
                    deps.insert(script.path.clone());
                    dsl::run_file(&mut ctx.for_mod(&name), script)?;
                }
                info!(mod_name = %name, scripts = scan.scripts.len(), "loaded mod");
            }
        }

        let PipelineContext {
            builders,
            mut image_cache,
            mut diagnostics,
            mods,
        } = ctx;
        let counts: Vec<(Kind, usize)> = Kind::ALL.iter().map(|&k| (k, builders.count(k))).collect();

        let mut instances = builders.instantiate(&mut diagnostics)?;
        let ids = assign_all(&mut instances);
        let refs = resolve_refs(&instances, &ids, &mut diagnostics);
        let loot = compile_all_loot(&instances.loot_tables, &ids, &mut diagnostics);
        let processed = process_all(&instances, &mut image_cache, &mut diagnostics)?;
        let extras = generate_extras(&instances, &ids, &mut diagnostics);

        deps.extend(mods.probed().map(PathBuf::from));
        let used_assets: Vec<PathBuf> = image_cache.used_assets().map(PathBuf::from).collect();
        deps.extend(used_assets.iter().cloned());

        let output = BuildOutput {
            instances: &instances,
            refs: &refs,
            loot: &loot,
            extras: &extras,
            processed: &processed,
        };
        let emitted = emit(&options.output_dir, &output, &used_assets, &deps)?;

        if let Some(path) = &options.cache {
            image_cache.save(path)?;
        }
        let stats = image_cache.stats();
        info!(
            memory_hits = stats.memory_hits,
            disk_hits = stats.disk_hits,
            realized = stats.realized,
            errors = diagnostics.error_count(),
            "build finished"
        );

        Ok(BuildSummary {
            diagnostics,
            stats,
            emitted,
            counts,
        })
    }
}
