//! Workspace command implementation
//!
//! Writes the registry as a gita workspace CSV so that every module can be
//! checked out side by side at its pinned commit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use known_good::defaults::{DEFAULT_GITA_WORKSPACE, DEFAULT_REGISTRY_FILE, REGISTRY_ENV};
use known_good::output::{status_line, OutputConfig, Status};
use known_good::workspace;

use super::load_registry;

/// Export gita workspace metadata
#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    /// Path to the registry
    #[arg(long, value_name = "FILE", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY_FILE)]
    pub known_good: PathBuf,

    /// gita workspace file to write
    #[arg(long, value_name = "FILE", default_value = DEFAULT_GITA_WORKSPACE)]
    pub gita_workspace: PathBuf,
}

/// Execute the `workspace` command.
pub fn execute(args: WorkspaceArgs, output: &OutputConfig) -> Result<()> {
    let registry = load_registry(&args.known_good)?;
    let count = workspace::export(&registry, &args.gita_workspace)
        .with_context(|| format!("Failed to write {}", args.gita_workspace.display()))?;
    println!(
        "{}",
        status_line(
            output,
            Status::Done,
            &format!(
                "Wrote {} repositories to {}",
                count,
                args.gita_workspace.display()
            )
        )
    );
    Ok(())
}
