//! Default values for known-good command-line options.
//!
//! Centralized so that every subcommand agrees on file names and locations.

/// Registry file read when `--known`/`--known-good` and `KNOWN_GOOD` are unset.
pub const DEFAULT_REGISTRY_FILE: &str = "known_good.json";

/// Output of the `override` command.
pub const DEFAULT_OVERRIDE_OUTPUT: &str = "known_good.updated.json";

/// Directory receiving the per-group dependency descriptors.
pub const DEFAULT_MODULES_DIR: &str = "bazel_common";

/// Directory receiving the coverage `BUILD` file.
pub const DEFAULT_COVERAGE_DIR: &str = "rust_coverage";

/// gita workspace file written by the `workspace` command.
pub const DEFAULT_GITA_WORKSPACE: &str = ".gita-workspace.csv";

/// Directory for coverage HTML reports of the quality runner.
pub const DEFAULT_COVERAGE_OUTPUT_DIR: &str = "artifacts/coverage";

/// Directory for the quality runner's markdown summaries.
pub const DEFAULT_REPORT_DIR: &str = "docs/verification";

/// Environment variable overriding the default registry path.
pub const REGISTRY_ENV: &str = "KNOWN_GOOD";
