//! Core types for toolshed.
//!
//! This crate holds everything that does not talk to the network:
//!
//! - [`config`]: the server catalog, its loaders and validation
//! - [`strategy`]: the [`InstallStrategy`] trait and the method registry
//! - [`installer`]: the dispatcher driving install, update and uninstall
//! - [`search_path`]: the search-path registry and `path-dirs` expansion
//! - [`process`]: the blocking external-process abstraction
//! - [`platform`]: host OS and architecture detection
//! - [`paths`]: default install root and config file locations
//!
//! Strategies that download or shell out live in the `toolshed-tools-*`
//! crates and plug into a [`StrategyRegistry`].

pub mod config;
pub mod error;
pub mod installer;
pub mod paths;
pub mod platform;
pub mod process;
pub mod search_path;
pub mod strategy;

pub use config::{
    ConfigLoader, ConfigStore, InstallMethod, InstallOptions, ServerCatalog, ServerConfig,
    ServerSpec, StaticLoader, TomlFileLoader,
};
pub use error::{Error, ErrorKind, IoContext, Operation, Phase, Result};
pub use installer::{Installer, ServerListing, UpdateReport};
pub use platform::{Arch, Os, Platform};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use search_path::PathRegistry;
pub use strategy::{InstallRequest, InstallStrategy, StrategyRegistry};
