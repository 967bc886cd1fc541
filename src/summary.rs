//! Summary extraction from captured tool output.
//!
//! The quality runner feeds the buffered output of `bazel coverage`,
//! `genhtml` and the rust coverage reporter through these extractors. A
//! missing marker leaves the corresponding field at its zero value.

use std::sync::LazyLock;

use regex::Regex;

static TEST_SUMMARY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Test cases: finished.*").expect("valid regex"));
static PASSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) passing").expect("valid regex"));
static FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) failing").expect("valid regex"));
static SKIPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) skipped").expect("valid regex"));
static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"out of (\d+) test cases").expect("valid regex"));

static COVERAGE_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lines\.+:\s+([\d.]+%)").expect("valid regex"));
static COVERAGE_FUNCTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"functions\.+:\s+([\d.]+%)").expect("valid regex"));
static COVERAGE_BRANCHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"branches\.+:\s+([\d.]+%)").expect("valid regex"));
static RUST_LINE_COVERAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"line coverage:\s+([\d.]+%)").expect("valid regex"));

/// Unit-test counts reported by `bazel test --test_summary=testcase`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
}

/// Coverage percentages, kept verbatim (e.g. `"93.0%"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    pub lines: String,
    pub functions: String,
    pub branches: String,
}

/// Extract unit-test counts from the `Test cases: finished ...` line.
pub fn extract_test_summary(logs: &str) -> TestSummary {
    let mut summary = TestSummary::default();
    let Some(line) = TEST_SUMMARY_LINE.find(logs).map(|m| m.as_str()) else {
        return summary;
    };
    summary.passed = capture_count(&PASSED, line);
    summary.failed = capture_count(&FAILED, line);
    summary.skipped = capture_count(&SKIPPED, line);
    summary.total = capture_count(&TOTAL, line);
    summary
}

/// Extract coverage percentages from genhtml or rust coverage output.
///
/// The rust reporter only prints line coverage; when present it takes
/// precedence over a genhtml `lines` figure.
pub fn extract_coverage_summary(logs: &str) -> CoverageSummary {
    let mut summary = CoverageSummary {
        lines: capture_text(&COVERAGE_LINES, logs),
        functions: capture_text(&COVERAGE_FUNCTIONS, logs),
        branches: capture_text(&COVERAGE_BRANCHES, logs),
    };
    let rust_lines = capture_text(&RUST_LINE_COVERAGE, logs);
    if !rust_lines.is_empty() {
        summary.lines = rust_lines;
    }
    summary
}

fn capture_count(pattern: &Regex, text: &str) -> u32 {
    pattern
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or_default()
}

fn capture_text(pattern: &Regex, text: &str) -> String {
    pattern
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// A markdown table with one row per entry, in insertion order.
#[derive(Debug, Clone)]
pub struct MarkdownReport {
    title: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownReport {
    /// `columns[0]` labels the row name; the rest label the values.
    pub fn new<S: Into<String>>(title: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            title: title.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = S>) {
        let mut row = vec![name.into()];
        row.extend(values.into_iter().map(Into::into));
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("# {}\n", self.title),
            format!("| {} |", self.columns.join(" | ")),
            format!(
                "| {} |",
                self.columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
            ),
        ];
        for row in &self.rows {
            lines.push(format!("| {} |", row.join(" | ")));
        }
        lines.push(String::new());
        lines.join("\n")
    }
}
