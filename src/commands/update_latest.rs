//! # Update-Latest Command Implementation
//!
//! Implements `known-good update-latest`, which moves every eligible module to
//! the head commit of its branch.
//!
//! ## Backends
//!
//! The GitHub CLI (`gh`) is used when it is installed, unless `--no-gh` is
//! given. Otherwise the REST API is called with the token from
//! `GITHUB_TOKEN`. With neither available the command fails before any
//! lookup.
//!
//! ## Exit Status
//!
//! - `0`: every lookup succeeded
//! - `2`: at least one module failed to resolve
//! - `3`: fatal error (registry unreadable or empty, no backend, output not
//!   writable)
//!
//! The updated registry is only written when `--output` is given.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use known_good::defaults::{DEFAULT_REGISTRY_FILE, REGISTRY_ENV};
use known_good::exit_codes;
use known_good::output::{status_line, OutputConfig, Status};
use known_good::overrides::{apply_latest, LatestOptions, LatestOutcome};
use known_good::registry::DEFAULT_BRANCH;
use known_good::resolver::{select_resolver, ResolverConfig, DEFAULT_API_URL};

use super::load_registry;

/// Update module commits to the latest commit on a branch
#[derive(Args, Debug)]
pub struct UpdateLatestArgs {
    /// Path to the registry
    #[arg(long, value_name = "FILE", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY_FILE)]
    pub known_good: PathBuf,

    /// Branch used for modules that do not name one
    #[arg(long, value_name = "BRANCH", default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Write the updated registry to this file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop on the first failed lookup
    #[arg(long)]
    pub fail_fast: bool,

    /// Never use the gh CLI, even if installed (requires GITHUB_TOKEN)
    #[arg(long)]
    pub no_gh: bool,

    /// Base URL of the REST API
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

/// Execute the `update-latest` command and return its exit code.
pub fn execute(args: UpdateLatestArgs, output: &OutputConfig) -> u8 {
    match run(args, output) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("ERROR: {:#}", error);
            exit_codes::FATAL
        }
    }
}

fn run(args: UpdateLatestArgs, output: &OutputConfig) -> Result<u8> {
    let mut registry = load_registry(&args.known_good)?;
    if registry.is_empty() {
        bail!("No modules found to update.");
    }

    let config = ResolverConfig {
        prefer_cli: !args.no_gh,
        api_url: args.api_url,
        ..ResolverConfig::from_env()
    };
    let resolver = select_resolver(&config)?;

    let options = LatestOptions {
        default_branch: args.branch,
        fail_fast: args.fail_fast,
    };
    let report = apply_latest(&mut registry, resolver.as_ref(), &options);

    for entry in &report.entries {
        match entry.outcome {
            LatestOutcome::Failed(_) => eprintln!("{}", entry),
            _ => println!("{}", entry),
        }
    }

    if let Some(path) = &args.output {
        registry
            .save(path)
            .with_context(|| format!("Failed writing output file {}", path.display()))?;
    }

    let failures = report.failures();
    if failures > 0 {
        eprintln!(
            "{}",
            status_line(
                output,
                Status::Failed,
                &format!("Completed with {} failure(s).", failures)
            )
        );
        return Ok(exit_codes::PARTIAL_FAILURE);
    }
    println!(
        "{}",
        status_line(
            output,
            Status::Done,
            &format!("Updated {} module(s).", report.updated())
        )
    );
    Ok(exit_codes::SUCCESS)
}
