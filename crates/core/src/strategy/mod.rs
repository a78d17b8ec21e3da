//! Install strategy system.
//!
//! Every [`InstallMethod`] variant is served by exactly one
//! [`InstallStrategy`] implementation registered in a [`StrategyRegistry`].
//! The dispatcher looks the strategy up by method; adding a method means
//! adding an enum variant and a strategy, never a new branch in the
//! dispatcher.
//!
//! # Example
//!
//! ```ignore
//! use toolshed_core::strategy::StrategyRegistry;
//!
//! let mut registry = StrategyRegistry::new();
//! registry.register(toolshed_tools_url::BinaryStrategy::new(downloader.clone()));
//! registry.register(toolshed_tools_github::GitHubStrategy::new(downloader));
//!
//! let strategy = registry.get(InstallMethod::Github).unwrap();
//! strategy.check_prerequisites()?;
//! strategy.install(&request)?;
//! ```

mod registry;

use std::path::{Path, PathBuf};

use crate::Result;
use crate::config::{InstallMethod, InstallOptions, ServerConfig};

pub use registry::StrategyRegistry;

/// Everything a strategy needs to produce an install directory.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    /// Server name.
    pub name: &'a str,
    /// Package spec, `owner/repo`, or URL.
    pub source: &'a str,
    /// Path of the produced executable, relative to `install_dir`.
    pub executable: &'a str,
    /// Download options.
    pub options: &'a InstallOptions,
    /// Directory to populate. Exists and is empty when `install` is called.
    pub install_dir: &'a Path,
}

impl<'a> InstallRequest<'a> {
    /// Build a request from a validated config.
    #[must_use]
    pub fn from_config(config: &'a ServerConfig, install_dir: &'a Path) -> Self {
        Self {
            name: &config.name,
            source: &config.source,
            executable: &config.executable,
            options: &config.options,
            install_dir,
        }
    }

    /// Absolute path of the declared executable.
    #[must_use]
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(self.executable)
    }
}

/// A back-end that populates an install directory.
pub trait InstallStrategy: Send + Sync {
    /// The method this strategy serves.
    fn method(&self) -> InstallMethod;

    /// Human-readable description for help text.
    fn description(&self) -> &'static str;

    /// Check that the external tool this strategy drives is available.
    ///
    /// Called by the dispatcher before any filesystem mutation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ToolNotFound`] if the tool cannot be resolved.
    fn check_prerequisites(&self) -> Result<()> {
        Ok(())
    }

    /// Populate `request.install_dir` and return it.
    ///
    /// # Errors
    ///
    /// Returns the first failure (process, network, format or I/O) unchanged;
    /// the dispatcher adds server context.
    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf>;
}
