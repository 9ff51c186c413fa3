//! Pipeline state threaded through every phase.
//!
//! [`PipelineContext`] owns the builder registry, the image cache, the mod
//! registry and the diagnostics for one run. Data modules never see it
//! directly: they get a [`ModContext`], which scopes asset loading to the
//! module's own mod.

use std::path::PathBuf;

use crate::builder::Builders;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::imaging::{ImageCache, ImageNode, Modifier};
use crate::mods::ModRegistry;

/// A data module written in Rust against the builder API.
pub trait DataModule {
    fn name(&self) -> &str;

    /// Called once, in load order, with the module's capability object.
    fn init(&self, ctx: &mut ModContext<'_>) -> Result<()>;
}

/// Process-wide state for one pipeline run.
pub struct PipelineContext {
    pub builders: Builders,
    pub image_cache: ImageCache,
    pub diagnostics: Diagnostics,
    pub mods: ModRegistry,
}

impl PipelineContext {
    pub fn new(mods: ModRegistry, image_cache: ImageCache) -> Self {
        Self {
            builders: Builders::new(),
            image_cache,
            diagnostics: Diagnostics::new(),
            mods,
        }
    }

    /// Capability object for modules of mod `mod_name`.
    pub fn for_mod(&mut self, mod_name: &str) -> ModContext<'_> {
        ModContext {
            pipeline: self,
            mod_name: mod_name.to_string(),
        }
    }
}

/// What a data module may touch.
pub struct ModContext<'a> {
    pipeline: &'a mut PipelineContext,
    mod_name: String,
}

impl ModContext<'_> {
    pub fn mod_name(&self) -> &str {
        &self.mod_name
    }

    /// Resolve an asset path through this mod's search order.
    pub fn resolve(&mut self, path: &str) -> Result<PathBuf> {
        self.pipeline.mods.resolve(&self.mod_name, path)
    }

    /// Load an image asset as a `file` node.
    pub fn load(&mut self, path: &str) -> Result<ImageNode> {
        let resolved = self.resolve(path)?;
        self.pipeline.image_cache.load_file(&resolved)
    }

    /// Load a palette-mode font source and rewrite its palette.
    pub fn load_font(&mut self, path: &str) -> Result<ImageNode> {
        Ok(self.load(path)?.modify(Modifier::FontPalette))
    }

    pub fn builders(&mut self) -> &mut Builders {
        &mut self.pipeline.builders
    }

    pub fn image_cache(&mut self) -> &mut ImageCache {
        &mut self.pipeline.image_cache
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut self.pipeline.diagnostics
    }
}
