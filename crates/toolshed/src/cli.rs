//! Argument parsing, CLI errors and exit codes.

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use toolshed_core::ErrorKind;

/// Success exit code
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Operation failure exit code
pub const EXIT_FAILED: i32 = 3;

/// CLI-specific error types with exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(toolshed::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Error from the installer (exit code 2 for configuration problems,
    /// 3 otherwise)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] toolshed_core::Error),

    /// Some updates in an `update-all` sweep failed (exit code 3)
    #[error("{failed} of {total} updates failed")]
    #[diagnostic(
        code(toolshed::cli::partial),
        help("Run `toolshed update <name>` for each failed tool to see the full error")
    )]
    Partial {
        /// Number of failed updates
        failed: usize,
        /// Number of attempted updates
        total: usize,
    },

    /// Writing command output failed (exit code 3)
    #[error("Failed to write output: {0}")]
    #[diagnostic(code(toolshed::cli::io))]
    Io(#[from] io::Error),
}

impl CliError {
    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Map a [`CliError`] to the process exit code.
#[must_use]
pub fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Core(e) if e.kind() == ErrorKind::Config => EXIT_CLI,
        CliError::Core(_) | CliError::Partial { .. } | CliError::Io(_) => EXIT_FAILED,
    }
}

/// Render an error to stderr through miette.
#[allow(clippy::print_stderr)]
pub fn render_error(err: CliError) {
    let report = Report::new(err);
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// Install and manage developer tools.
#[derive(Parser, Debug)]
#[command(name = "toolshed", version, about = "Install and manage developer tools")]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Server configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding one subdirectory per installed tool.
    #[arg(long, global = true, value_name = "DIR")]
    pub install_root: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Answer yes to confirmation prompts.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install a configured tool, replacing any existing installation.
    Install {
        /// Server name.
        name: String,
    },
    /// Remove an installed tool.
    Uninstall {
        /// Server name.
        name: String,
    },
    /// Reinstall an installed tool from scratch.
    Update {
        /// Server name.
        name: String,
    },
    /// Reinstall every installed tool, continuing past failures.
    UpdateAll,
    /// List configured and installed tools.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the search path with every installed tool's directories added.
    SetupPaths,
    /// List supported install methods.
    Methods,
}

/// Parse command-line arguments, exiting on error.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
