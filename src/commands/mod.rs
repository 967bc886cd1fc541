//! # CLI Command Implementations
//!
//! Each subcommand of `known-good` lives in its own file and provides:
//! - an `Args` struct with the command-specific options, derived with `clap`,
//! - an `execute` function that loads the registry, calls into the
//!   `known_good` library and reports the outcome.
//!
//! All commands except `update-latest` return `anyhow::Result<()>` and map
//! to exit code 1 on error. `update-latest` has its own 0/2/3 exit status.

pub mod completions;
pub mod generate;
pub mod overrides;
pub mod quality;
pub mod update_latest;
pub mod workspace;

use std::path::Path;

use anyhow::{Context, Result};
use known_good::registry::{self, Registry};
use log::info;

/// Load the registry at `path`, naming the file in any error.
pub fn load_registry(path: &Path) -> Result<Registry> {
    info!("Loading {}", path.display());
    registry::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}
