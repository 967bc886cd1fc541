//! # Override Command Implementation
//!
//! Implements `known-good override`, which pins modules to explicit commits
//! and writes the result to a new registry file.
//!
//! Each `--module-override` takes one of two forms:
//!
//! - `module_name@commit_hash`
//! - `module_name@repo_url@commit_hash`, which also replaces the origin
//!
//! Every spec is validated before any module is touched. Names that match no
//! module only produce a warning.
//!
//! ```bash
//! known-good override --known known_good.json --output known_good.updated.json \
//!     --module-override score_baselibs@abc123d \
//!     --module-override score_logging@https://github.com/fork/logging.git@def4567
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;

use known_good::defaults::{DEFAULT_OVERRIDE_OUTPUT, DEFAULT_REGISTRY_FILE, REGISTRY_ENV};
use known_good::overrides::{apply_overrides, parse_override_specs};

use super::load_registry;

/// Override module commits in a known-good registry
#[derive(Args, Debug)]
pub struct OverrideArgs {
    /// Path to the input registry
    #[arg(long, value_name = "FILE", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY_FILE)]
    pub known: PathBuf,

    /// Path of the registry to write
    #[arg(long, value_name = "FILE", default_value = DEFAULT_OVERRIDE_OUTPUT)]
    pub output: PathBuf,

    /// Pin a module: `name@hash` or `name@repo_url@hash` (repeatable)
    #[arg(long = "module-override", value_name = "SPEC", required = true)]
    pub module_overrides: Vec<String>,

    /// Print the updated registry instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the `override` command.
pub fn execute(args: OverrideArgs) -> Result<()> {
    let specs = parse_override_specs(&args.module_overrides)?;
    let mut registry = load_registry(&args.known)?;

    apply_overrides(&mut registry, &specs);
    registry.write(&args.output, args.dry_run)?;
    if !args.dry_run {
        info!("Wrote {}", args.output.display());
    }
    Ok(())
}
