//! toolshed command-line interface.
//!
//! The binary is a thin wrapper: [`cli`] parses arguments and maps errors to
//! exit codes, [`commands`] wires the strategy registry and runs each
//! subcommand against a [`toolshed_core::Installer`], and [`tracing`] sets up
//! structured logging on stderr.

pub mod cli;
pub mod commands;
pub mod tracing;
