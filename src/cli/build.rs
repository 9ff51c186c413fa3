//! The build command.

use std::path::PathBuf;

use clap::Args;

use crate::error::Result;
use crate::output::{display_path, plural, Printer};
use crate::pipeline::{BuildOptions, Pipeline};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Repository root containing src/
    #[arg(long, default_value = ".")]
    pub src_dir: PathBuf,

    /// Where sheets and manifests are written
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Mods in load order; the first is the base game
    #[arg(long, value_delimiter = ',', default_value = "outpost")]
    pub mods: Vec<String>,

    /// Image cache file [default: <output-dir>/.image_cache]
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Neither read nor write the image cache
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,
}

impl BuildArgs {
    pub fn options(&self) -> BuildOptions {
        let cache = if self.no_cache {
            None
        } else {
            Some(
                self.cache
                    .clone()
                    .unwrap_or_else(|| self.output_dir.join(".image_cache")),
            )
        };
        BuildOptions {
            src_dir: self.src_dir.clone(),
            output_dir: self.output_dir.clone(),
            mods: self.mods.clone(),
            cache,
        }
    }
}

/// Run the build. Returns whether any error was reported.
pub fn run(args: BuildArgs) -> Result<bool> {
    let printer = Printer::new();
    printer.status("Building", &format!("mods {}", args.mods.join(", ")));
    if args.no_cache {
        printer.warning("Uncached", "every image will be realized from scratch");
    }

    let summary = Pipeline::new(args.options()).run()?;

    for (kind, count) in &summary.counts {
        if *count > 0 {
            printer.info("Declared", &plural(*count, kind.name(), &format!("{}s", kind.name())));
        }
    }
    let stats = summary.stats;
    printer.info(
        "Images",
        &format!(
            "{} memory hits, {} disk hits, {} realized",
            stats.memory_hits, stats.disk_hits, stats.realized
        ),
    );
    summary.diagnostics.print(&printer);

    let warnings = summary.diagnostics.warning_count();
    if warnings > 0 {
        printer.warning("Warned", &plural(warnings, "warning", "warnings"));
    }
    let failed = summary.diagnostics.saw_error();
    if failed {
        printer.error(
            "Failed",
            &plural(summary.diagnostics.error_count(), "error", "errors"),
        );
    } else {
        printer.status(
            "Finished",
            &format!(
                "{} in {}",
                plural(summary.emitted.files.len(), "file", "files"),
                display_path(&args.output_dir)
            ),
        );
    }
    Ok(failed)
}
