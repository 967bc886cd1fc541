//! # Generate Command Implementation
//!
//! Implements `known-good generate`, which renders the registry into
//! `score_modules_<group>.MODULE.bazel` files and, for the software groups,
//! a coverage `BUILD` file.
//!
//! `--repo-override <URL>@<COMMIT>` replaces the commit of every module
//! fetched from `<URL>` without editing the registry. `--dry-run` prints each
//! file between BEGIN/END markers instead of writing it.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};

use known_good::defaults::{
    DEFAULT_COVERAGE_DIR, DEFAULT_MODULES_DIR, DEFAULT_REGISTRY_FILE, REGISTRY_ENV,
};
use known_good::generator::{
    is_coverage_artifact, plan_artifacts, write_artifacts, GenerateOptions, OverrideKind,
    DEFAULT_SOFTWARE_MARKER,
};
use known_good::output::{status_line, OutputConfig, Status};
use known_good::overrides::RepoOverrides;

use super::load_registry;

/// How commit-pinned modules are overridden
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OverrideType {
    /// git_override blocks fetching each module at its commit
    Git,
    /// local_path_override blocks pointing at local checkouts
    #[value(alias = "local_path")]
    LocalPath,
}

impl From<OverrideType> for OverrideKind {
    fn from(value: OverrideType) -> Self {
        match value {
            OverrideType::Git => OverrideKind::Git,
            OverrideType::LocalPath => OverrideKind::LocalPath,
        }
    }
}

/// Generate Bazel module and coverage descriptors from the registry
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the registry
    #[arg(long, value_name = "FILE", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY_FILE)]
    pub known: PathBuf,

    /// Directory for the per-group MODULE.bazel files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_MODULES_DIR)]
    pub output_dir_modules: PathBuf,

    /// Directory for the coverage BUILD file
    #[arg(long, value_name = "DIR", default_value = DEFAULT_COVERAGE_DIR)]
    pub output_dir_coverage: PathBuf,

    /// Override the commit of a repository: `<URL>@<COMMIT>` (repeatable)
    #[arg(long = "repo-override", value_name = "URL@COMMIT")]
    pub repo_overrides: Vec<String>,

    /// Kind of override block to emit
    #[arg(long, value_enum, default_value_t = OverrideType::Git)]
    pub override_type: OverrideType,

    /// Groups whose name contains this marker get coverage reports
    #[arg(long, value_name = "MARKER", default_value = DEFAULT_SOFTWARE_MARKER)]
    pub software_marker: String,

    /// Print the generated files instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the `generate` command.
pub fn execute(args: GenerateArgs, output: &OutputConfig) -> Result<()> {
    let overrides = RepoOverrides::parse(&args.repo_overrides)?;
    let registry = load_registry(&args.known)?;
    if registry.is_empty() {
        bail!("No modules found in {}", args.known.display());
    }

    let kind = OverrideKind::from(args.override_type);
    let mut options = GenerateOptions::new(&args.output_dir_modules, &args.output_dir_coverage);
    options.overrides = overrides;
    options.kind = kind;
    options.software_marker = args.software_marker;

    let artifacts = plan_artifacts(&registry, &options)?;

    if args.dry_run {
        for artifact in &artifacts {
            let section = if is_coverage_artifact(&artifact.path) {
                "BUILD"
            } else {
                "MODULE"
            };
            println!("\nDry run: would write to {}\n", artifact.path.display());
            println!("---- BEGIN GENERATED CONTENT FOR {} ----", section);
            print!("{}", artifact.content);
            println!("---- END GENERATED CONTENT FOR {} ----", section);
        }
        return Ok(());
    }

    write_artifacts(&artifacts)?;
    let mut total_modules = 0;
    for artifact in &artifacts {
        let message = if is_coverage_artifact(&artifact.path) {
            format!("Generated {}", artifact.path.display())
        } else {
            total_modules += artifact.module_count;
            format!(
                "Generated {} with {} {}_override entries",
                artifact.path.display(),
                artifact.module_count,
                kind.label()
            )
        };
        println!("{}", status_line(output, Status::Done, &message));
    }
    println!(
        "\nSuccessfully generated {} file(s) with {} total modules",
        artifacts.len(),
        total_modules
    );
    Ok(())
}
