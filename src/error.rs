//! # Error Handling
//!
//! This module defines the centralized error type for the `known-good`
//! library. It uses `thiserror` to describe every failure class the registry
//! tooling distinguishes, so that callers can decide which errors abort a run
//! and which are counted per module.
//!
//! ## Failure Classes
//!
//! - **Fatal, before any mutation**: [`Error::Parse`] (JSON syntax) and
//!   [`Error::Schema`] (structurally invalid registry).
//! - **Fatal, no partial application**: [`Error::Usage`] (bad override spec or
//!   argument).
//! - **Recoverable per module**: [`Error::Resolution`] (remote lookup failed)
//!   and [`Error::MalformedOrigin`] (origin URL cannot be split into
//!   owner/repo).
//! - **Fatal, nothing written**: [`Error::EmptyOutput`] (a generated artifact
//!   would have been empty).
//!
//! The remaining variants wrap configuration, process and library errors.

use thiserror::Error;

/// Main error type for known-good operations
#[derive(Error, Debug)]
pub enum Error {
    /// The registry text is not valid JSON.
    ///
    /// Carries the 1-based position of the fault and the offending source line
    /// so the error can be rendered with a caret marker.
    #[error("Invalid JSON at line {line}, column {column}\n{source_line}\n{}^\n{message}.{}", " ".repeat(column.saturating_sub(1)), hint.as_ref().map(|h| format!(" {}", h)).unwrap_or_default())]
    Parse {
        line: usize,
        column: usize,
        source_line: String,
        message: String,
        /// Diagnostic hint for the common "unexpected value" faults
        hint: Option<String>,
    },

    /// The registry is valid JSON but does not have the expected shape.
    #[error("Invalid registry structure: {message}")]
    Schema { message: String },

    /// An override spec or command-line value was rejected.
    #[error("{message}")]
    Usage { message: String },

    /// A remote "latest commit" lookup failed for one module.
    #[error("Failed to resolve {target}: {message}")]
    Resolution { target: String, message: String },

    /// An origin URL could not be parsed into `<owner>/<repo>`.
    #[error("Cannot parse owner/repo from {url}: {message}")]
    MalformedOrigin { url: String, message: String },

    /// A generator produced no emittable blocks.
    #[error("No valid modules to generate {artifact} for group '{group}'")]
    EmptyOutput { artifact: String, group: String },

    /// The environment cannot support the requested operation.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An external command could not be run to completion.
    #[error("Command failed: {command} - {message}")]
    Process { command: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP client error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A CSV writing error, wrapped from `csv::Error`.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Convenience constructor for [`Error::Usage`].
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Schema`].
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema {
            message: message.into(),
        }
    }

    /// Returns `true` for errors that are scoped to a single module and must
    /// not abort processing of its siblings.
    pub fn is_per_module(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. } | Error::MalformedOrigin { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
