//! # Quality Command Implementation
//!
//! Implements `known-good quality`, which runs unit tests and coverage
//! extraction for the software modules and writes `unit_test_summary.md` and
//! `coverage_summary.md` into the report directory.
//!
//! Tool output is streamed live. The command fails when any test or coverage
//! command exits non-zero; the reports are written either way.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use known_good::defaults::{
    DEFAULT_COVERAGE_OUTPUT_DIR, DEFAULT_REGISTRY_FILE, DEFAULT_REPORT_DIR, REGISTRY_ENV,
};
use known_good::generator::DEFAULT_SOFTWARE_MARKER;
use known_good::output::{status_line, OutputConfig, Status};
use known_good::quality::{run_quality, QualityOptions, SystemExecutor};

use super::load_registry;

/// Run unit tests and coverage analysis for software modules
#[derive(Args, Debug)]
pub struct QualityArgs {
    /// Path to the registry
    #[arg(long, value_name = "FILE", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY_FILE)]
    pub known_good: PathBuf,

    /// Directory for coverage HTML output
    #[arg(long, value_name = "DIR", default_value = DEFAULT_COVERAGE_OUTPUT_DIR)]
    pub coverage_output_dir: PathBuf,

    /// Directory for the markdown summaries
    #[arg(long, value_name = "DIR", default_value = DEFAULT_REPORT_DIR)]
    pub report_dir: PathBuf,

    /// Comma-separated module names to test (default: all)
    #[arg(long, value_name = "MODULES", value_delimiter = ',')]
    pub modules_to_test: Vec<String>,

    /// Registry group holding the software modules
    #[arg(long, value_name = "GROUP", default_value = DEFAULT_SOFTWARE_MARKER)]
    pub group: String,
}

/// Execute the `quality` command.
pub fn execute(args: QualityArgs, output: &OutputConfig) -> Result<()> {
    let registry = load_registry(&args.known_good)?;

    let mut options = QualityOptions::new(&args.coverage_output_dir);
    options.modules_to_test = args.modules_to_test;
    options.group = args.group;

    let report = run_quality(&registry, &options, &SystemExecutor)?;
    for path in report.write_reports(&args.report_dir)? {
        println!(
            "{}",
            status_line(output, Status::Done, &format!("Wrote {}", path.display()))
        );
    }
    println!("\n{}", report.unit_test_markdown());
    println!("{}", report.coverage_markdown());

    if report.failed() {
        bail!("One or more test or coverage commands failed");
    }
    Ok(())
}
