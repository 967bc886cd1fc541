//! # Quality Runner
//!
//! Runs unit tests and coverage extraction for the software modules of a
//! registry and summarizes the results as markdown tables.
//!
//! For each selected module the runner
//!
//! 1. runs `bazel coverage` over the module's code root (the coverage data is
//!    produced by the test run itself) and extracts the test-case summary,
//! 2. for `cpp` modules, runs `genhtml` on the combined coverage data,
//! 3. for `rust` modules, runs the generated `rust_coverage_<name>` target.
//!
//! Every command goes through a [`CommandExecutor`], which streams the output
//! live and returns it for summary extraction. The run is reported as failed
//! when any command exits non-zero.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::generator::DEFAULT_SOFTWARE_MARKER;
use crate::process::{ProcessOutput, ProcessRunner};
use crate::registry::{Module, Registry};
use crate::summary::{
    extract_coverage_summary, extract_test_summary, CoverageSummary, MarkdownReport, TestSummary,
};

/// Modules whose rust coverage cannot be extracted (proc-macro heavy).
pub const DISABLED_RUST_COVERAGE: [&str; 2] = ["score_communication", "score_orchestrator"];

pub const UNIT_TEST_REPORT: &str = "unit_test_summary.md";
pub const COVERAGE_REPORT: &str = "coverage_summary.md";

/// Executes prepared commands.
pub trait CommandExecutor {
    fn execute(&self, command: &ProcessRunner) -> Result<ProcessOutput>;
}

/// Runs commands on the host, echoing their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&self, command: &ProcessRunner) -> Result<ProcessOutput> {
        info!("Running command: {}", command.command_line());
        command.run()
    }
}

/// `bazel coverage` invocation running the unit tests of `module`.
pub fn unit_test_command(module: &Module) -> ProcessRunner {
    let name = &module.name;
    let metadata = &module.metadata;
    ProcessRunner::new("bazel")
        .args([
            "coverage".to_string(),
            "--test_verbose_timeout_warnings".to_string(),
            "--test_timeout=1200".to_string(),
            "--config=unit-tests".to_string(),
            "--config=ferrocene-coverage".to_string(),
            "--test_summary=testcase".to_string(),
            "--test_output=errors".to_string(),
            "--nocache_test_results".to_string(),
            format!("--instrumentation_filter=@{}", name),
            format!("@{}{}", name, metadata.code_root_path),
        ])
        .args(
            metadata
                .extra_test_config
                .iter()
                .map(|config| format!("--@{}{}", name, config)),
        )
        .arg("--")
        .args(
            metadata
                .exclude_test_targets
                .iter()
                .map(|target| format!("-@{}{}", name, target)),
        )
}

/// `bazel run` invocation of the generated rust coverage report target.
pub fn rust_coverage_command(module: &Module) -> ProcessRunner {
    ProcessRunner::new("bazel").args([
        "run".to_string(),
        format!("//rust_coverage:rust_coverage_{}", module.name),
    ])
}

/// `genhtml` invocation over the combined coverage data below `output_path`.
pub fn genhtml_command(bazel_output_path: &str, output_dir: &Path) -> ProcessRunner {
    ProcessRunner::new("genhtml").args([
        format!("{}/_coverage/_coverage_report.dat", bazel_output_path),
        format!("--output-directory={}", output_dir.display()),
        "--show-details".to_string(),
        "--legend".to_string(),
        "--function-coverage".to_string(),
        "--branch-coverage".to_string(),
    ])
}

/// Settings for [`run_quality`].
#[derive(Debug, Clone)]
pub struct QualityOptions {
    pub coverage_output_dir: PathBuf,
    /// Only these modules are tested; empty means all.
    pub modules_to_test: Vec<String>,
    /// Registry group holding the modules under test.
    pub group: String,
}

impl QualityOptions {
    pub fn new(coverage_output_dir: impl Into<PathBuf>) -> Self {
        Self {
            coverage_output_dir: coverage_output_dir.into(),
            modules_to_test: Vec::new(),
            group: DEFAULT_SOFTWARE_MARKER.to_string(),
        }
    }
}

/// Unit-test result of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTestResult {
    pub module: String,
    pub summary: TestSummary,
    pub exit_code: i32,
}

/// Coverage result of one module and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageResult {
    /// `<module>_<language>`
    pub label: String,
    pub summary: CoverageSummary,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityReport {
    pub unit_tests: Vec<UnitTestResult>,
    pub coverage: Vec<CoverageResult>,
}

impl QualityReport {
    /// `true` when any test or coverage command exited non-zero.
    pub fn failed(&self) -> bool {
        self.unit_tests.iter().any(|r| r.exit_code != 0)
            || self.coverage.iter().any(|r| r.exit_code != 0)
    }

    pub fn unit_test_markdown(&self) -> String {
        let mut report = MarkdownReport::new(
            "Unit Test Execution Summary",
            ["module", "passed", "failed", "skipped", "total"],
        );
        for result in &self.unit_tests {
            let s = result.summary;
            report.push_row(
                result.module.as_str(),
                [s.passed, s.failed, s.skipped, s.total].map(|n| n.to_string()),
            );
        }
        report.render()
    }

    pub fn coverage_markdown(&self) -> String {
        let mut report = MarkdownReport::new(
            "Coverage Analysis Summary",
            ["module", "lines", "functions", "branches"],
        );
        for result in &self.coverage {
            let s = &result.summary;
            report.push_row(
                result.label.as_str(),
                [s.lines.as_str(), s.functions.as_str(), s.branches.as_str()],
            );
        }
        report.render()
    }

    /// Write both markdown summaries into `report_dir`.
    pub fn write_reports<P: AsRef<Path>>(&self, report_dir: P) -> Result<Vec<PathBuf>> {
        let report_dir = report_dir.as_ref();
        fs::create_dir_all(report_dir)?;
        let unit_path = report_dir.join(UNIT_TEST_REPORT);
        fs::write(&unit_path, self.unit_test_markdown())?;
        let coverage_path = report_dir.join(COVERAGE_REPORT);
        fs::write(&coverage_path, self.coverage_markdown())?;
        Ok(vec![unit_path, coverage_path])
    }
}

/// Run tests and coverage for the selected modules of `options.group`.
pub fn run_quality(
    registry: &Registry,
    options: &QualityOptions,
    executor: &dyn CommandExecutor,
) -> Result<QualityReport> {
    let group = registry.group(&options.group).ok_or_else(|| {
        Error::usage(format!(
            "Group '{}' not found in registry. Available groups: {}",
            options.group,
            registry
                .groups()
                .iter()
                .map(|g| g.name())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;
    fs::create_dir_all(&options.coverage_output_dir)?;

    if !options.modules_to_test.is_empty() {
        info!(
            "Tests requested only for: {}",
            options.modules_to_test.join(", ")
        );
    }

    let mut report = QualityReport::default();
    for module in group.modules() {
        if !options.modules_to_test.is_empty() && !options.modules_to_test.contains(&module.name) {
            info!("Skipping module {}", module.name);
            continue;
        }
        info!("Testing module: {}", module.name);

        let output = executor.execute(&unit_test_command(module))?;
        report.unit_tests.push(UnitTestResult {
            module: module.name.clone(),
            summary: extract_test_summary(&output.stdout),
            exit_code: output.exit_code,
        });

        if module.metadata.has_language("cpp") {
            info!("Running cpp coverage analysis");
            let output = cpp_coverage(module, &options.coverage_output_dir, executor)?;
            report.coverage.push(coverage_result(module, "cpp", &output));
        }

        if module.metadata.has_language("rust") {
            if DISABLED_RUST_COVERAGE.contains(&module.name.as_str()) {
                info!("Skipping rust coverage extraction for module {}", module.name);
            } else {
                info!("Running rust coverage analysis");
                fs::create_dir_all(options.coverage_output_dir.join("rust").join(&module.name))?;
                let output = executor.execute(&rust_coverage_command(module))?;
                report.coverage.push(coverage_result(module, "rust", &output));
            }
        }
        info!("Finished testing module: {}", module.name);
    }
    Ok(report)
}

fn coverage_result(module: &Module, language: &str, output: &ProcessOutput) -> CoverageResult {
    CoverageResult {
        label: format!("{}_{}", module.name, language),
        summary: extract_coverage_summary(&output.stdout),
        exit_code: output.exit_code,
    }
}

fn cpp_coverage(
    module: &Module,
    coverage_output_dir: &Path,
    executor: &dyn CommandExecutor,
) -> Result<ProcessOutput> {
    let output_dir = coverage_output_dir.join("cpp").join(&module.name);
    fs::create_dir_all(&output_dir)?;

    let output_path = bazel_info("output_path", executor)?;
    let output_base = bazel_info("output_base", executor)?;
    executor.execute(&genhtml_command(&output_path, &output_dir).current_dir(output_base))
}

fn bazel_info(key: &str, executor: &dyn CommandExecutor) -> Result<String> {
    let command = ProcessRunner::new("bazel").args(["info", key]);
    let output = executor.execute(&command)?;
    if !output.success() {
        return Err(Error::Process {
            command: command.command_line(),
            message: format!("exited with code {}", output.exit_code),
        });
    }
    Ok(output.stdout.trim().to_string())
}
