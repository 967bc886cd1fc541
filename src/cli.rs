//! CLI argument parsing, logging setup and command dispatch

use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use known_good::exit_codes;
use known_good::output::OutputConfig;

use crate::commands;

/// known-good - Maintain known-good module pins and derive build descriptors
#[derive(Parser, Debug)]
#[command(name = "known-good")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pin modules to specific commits and write an updated registry
    Override(commands::overrides::OverrideArgs),

    /// Move modules to the latest commit of their branch
    UpdateLatest(commands::update_latest::UpdateLatestArgs),

    /// Generate MODULE.bazel fragments and coverage BUILD files
    Generate(commands::generate::GenerateArgs),

    /// Export the registry as gita workspace metadata
    Workspace(commands::workspace::WorkspaceArgs),

    /// Run unit tests and coverage extraction for software modules
    Quality(commands::quality::QualityArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::Override(args) => args.verbose,
            Commands::Generate(args) => args.verbose,
            _ => false,
        }
    }
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    pub fn execute(self) -> Result<u8> {
        let level = if self.command.verbose() {
            self.log_level.max(LevelFilter::Debug)
        } else {
            self.log_level
        };
        init_logging(level);

        let output = OutputConfig::from_env_and_flag(&self.color);
        console::set_colors_enabled(output.use_color);
        console::set_colors_enabled_stderr(output.use_color);

        // update-latest reports its own 0/2/3 exit status
        let result = match self.command {
            Commands::UpdateLatest(args) => {
                return Ok(commands::update_latest::execute(args, &output))
            }
            Commands::Override(args) => commands::overrides::execute(args),
            Commands::Generate(args) => commands::generate::execute(args, &output),
            Commands::Workspace(args) => commands::workspace::execute(args, &output),
            Commands::Quality(args) => commands::quality::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        };
        result.map(|()| exit_codes::SUCCESS)
    }
}

/// Route `log` records to stderr as `LEVEL: message`.
fn init_logging(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_raises_log_level() {
        let cli = Cli::try_parse_from([
            "known-good",
            "generate",
            "--known",
            "known_good.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.command.verbose());
        assert_eq!(cli.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_log_level_parses() {
        let cli = Cli::try_parse_from([
            "known-good",
            "--log-level",
            "warn",
            "workspace",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LevelFilter::Warn);
        assert!(!cli.command.verbose());
    }

    #[test]
    fn test_override_requires_module_override() {
        let err = Cli::try_parse_from(["known-good", "override"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
