pub mod build;

use clap::Parser;

/// tilegen - compile data modules and raw images into sheets and manifests
#[derive(Parser, Debug)]
#[command(name = "tilegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub build: build::BuildArgs,

    /// Log pipeline phases at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}
