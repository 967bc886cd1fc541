//! # Output Configuration
//!
//! Controls how the CLI decorates its console output.
//!
//! The following flags and environment variables are honoured:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set (any value, https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even when stdout is not a TTY
//! - `TERM=dumb` disables colors
//!
//! Without colors, emoji markers fall back to bracketed plain-text labels so
//! that logs stay greppable.
//!
//! ```rust
//! use known_good::output::{status_line, OutputConfig, Status};
//!
//! let config = OutputConfig::without_color();
//! assert_eq!(status_line(&config, Status::Done, "Wrote BUILD"), "[OK] Wrote BUILD");
//! ```

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from the environment and the value of
    /// `--color` (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, else `plain`.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Outcome class of a reported step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Warning,
    Failed,
}

impl Status {
    fn markers(self) -> (&'static str, &'static str) {
        match self {
            Status::Done => ("✅", "[OK]"),
            Status::Warning => ("⚠️", "[WARN]"),
            Status::Failed => ("❌", "[ERROR]"),
        }
    }
}

/// A message prefixed with the marker for `status`, colored when enabled.
pub fn status_line(config: &OutputConfig, status: Status, message: &str) -> String {
    let (emoji_str, plain) = status.markers();
    let marker = emoji(config, emoji_str, plain);
    if !config.use_color {
        return format!("{} {}", marker, message);
    }
    let message = match status {
        Status::Done => style(message).green(),
        Status::Warning => style(message).yellow(),
        Status::Failed => style(message).red(),
    };
    format!("{} {}", marker, message.force_styling(true))
}
