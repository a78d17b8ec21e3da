//! Installer dispatcher.
//!
//! Orchestrates validate → prerequisite check → clean reinstall → strategy
//! → path registration, and implements update, uninstall and the
//! partial-failure tolerant `update_all` sweep.
//!
//! Installed state is never recorded: a tool is installed iff its directory
//! under the install root exists and holds a non-hidden entry (see
//! [`paths::is_populated`]).
//!
//! All operations are synchronous and assume a single caller; the
//! [`PathRegistry`] is borrowed mutably for the duration of each call.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigStore, ServerConfig, validate};
use crate::error::{IoContext, Operation, Phase};
use crate::paths;
use crate::search_path::PathRegistry;
use crate::strategy::{InstallRequest, InstallStrategy, StrategyRegistry};
use crate::{Error, Result};

/// Outcome of [`Installer::update_all`].
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Servers updated successfully, in processing order.
    pub updated: Vec<String>,
    /// Servers whose update failed, with the error, in processing order.
    pub failed: Vec<(String, Error)>,
}

impl UpdateReport {
    /// Whether every update succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of servers processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len()
    }

    /// Names of failed servers.
    #[must_use]
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Result of [`Installer::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerListing {
    /// Every configured server, sorted.
    pub available: Vec<String>,
    /// Every installed server, sorted.
    pub installed: Vec<String>,
}

/// Dispatches install operations to strategies.
#[derive(Debug)]
pub struct Installer {
    store: ConfigStore,
    strategies: StrategyRegistry,
    install_root: PathBuf,
}

impl Installer {
    /// Create an installer rooted at `install_root`.
    #[must_use]
    pub fn new(
        store: ConfigStore,
        strategies: StrategyRegistry,
        install_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            strategies,
            install_root: install_root.into(),
        }
    }

    /// Root directory holding one subdirectory per tool.
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Install directory for `name`.
    #[must_use]
    pub fn install_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }

    /// Whether `name` is currently installed.
    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        is_safe_name(name) && paths::is_populated(&self.install_dir(name))
    }

    /// Registered strategies.
    #[must_use]
    pub const fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// The configuration store, e.g. to force a reload.
    pub fn config_store(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    /// Names of installed tools, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the install root exists but cannot be read.
    pub fn installed(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.install_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::io(
                    e,
                    Some(self.install_root.clone()),
                    "listing installed tools",
                ));
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| self.is_installed(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Configured and installed servers.
    ///
    /// # Errors
    ///
    /// Returns configuration load errors or install-root read errors.
    pub fn list(&mut self) -> Result<ServerListing> {
        Ok(ServerListing {
            available: self.store.load()?.names(),
            installed: self.installed()?,
        })
    }

    /// Install `name`, replacing any existing installation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] wrapping the first failure. A failed
    /// strategy may leave a partially written install directory behind.
    pub fn install(&mut self, name: &str, paths: &mut PathRegistry) -> Result<PathBuf> {
        self.run_install(name, Operation::Install, paths)
    }

    /// Reinstall an installed tool from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] without touching the filesystem if `name` is
    /// not installed; otherwise the same errors as [`install`](Self::install).
    pub fn update(&mut self, name: &str, paths: &mut PathRegistry) -> Result<PathBuf> {
        if !self.is_installed(name) {
            return Err(Error::state(name, "is not installed"));
        }
        self.run_install(name, Operation::Update, paths)
    }

    /// Unregister and delete an installed tool.
    ///
    /// If the tool's configuration is gone or invalid, its search-path
    /// entries cannot be computed; the directory is still removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if `name` is not installed, or
    /// [`Error::Operation`] if configuration loading or removal fails.
    pub fn uninstall(&mut self, name: &str, paths: &mut PathRegistry) -> Result<()> {
        if !self.is_installed(name) {
            return Err(Error::state(name, "is not installed"));
        }
        let wrap = |phase| move |e| Error::operation(name, Operation::Uninstall, phase, e);
        let dir = self.install_dir(name);

        let spec = self.store.get(name).map_err(wrap(Phase::Validate))?;
        match validate(name, spec.as_ref()) {
            Ok(config) => {
                paths.remove(&config, &dir);
            }
            Err(e) => warn!(server = %name, error = %e, "Cannot compute search-path entries"),
        }

        std::fs::remove_dir_all(&dir)
            .with_path(&dir, "removing install directory")
            .map_err(wrap(Phase::Remove))?;

        info!(server = %name, dir = ?dir, "Uninstalled");
        Ok(())
    }

    /// Update every installed tool, continuing past failures.
    ///
    /// # Errors
    ///
    /// Only fails if the installed set cannot be listed. Per-tool failures
    /// are recorded in the returned [`UpdateReport`].
    pub fn update_all(&mut self, paths: &mut PathRegistry) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        for name in self.installed()? {
            match self.update(&name, paths) {
                Ok(_) => report.updated.push(name),
                Err(e) => {
                    error!(server = %name, error = %e, "Update failed");
                    report.failed.push((name, e));
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Update sweep finished"
        );
        Ok(report)
    }

    /// Register search-path entries for every installed tool.
    ///
    /// Idempotent: entries already present are not added again. Installed
    /// tools without a valid configuration are skipped.
    ///
    /// # Errors
    ///
    /// Returns configuration load errors or install-root read errors.
    pub fn setup_paths(&mut self, paths: &mut PathRegistry) -> Result<usize> {
        let catalog = self.store.load()?;
        let mut added = 0;

        for name in self.installed()? {
            match validate(&name, catalog.get(&name)) {
                Ok(config) => added += paths.add(&config, &self.install_dir(&name)),
                Err(e) => warn!(server = %name, error = %e, "Skipping installed tool"),
            }
        }

        debug!(added, "Search path set up");
        Ok(added)
    }

    fn resolve(&mut self, name: &str) -> Result<(ServerConfig, Arc<dyn InstallStrategy>)> {
        if !is_safe_name(name) {
            return Err(Error::config_field(
                name,
                "name",
                "server names must be a single non-hidden path segment",
            ));
        }
        let spec = self.store.get(name)?;
        let config = validate(name, spec.as_ref())?;
        let strategy = self.strategies.get(config.method).cloned().ok_or_else(|| {
            Error::config_field(
                name,
                "install-method",
                format!("no strategy registered for '{}'", config.method),
            )
        })?;
        Ok((config, strategy))
    }

    fn run_install(
        &mut self,
        name: &str,
        operation: Operation,
        paths: &mut PathRegistry,
    ) -> Result<PathBuf> {
        let wrap = |phase| move |e| Error::operation(name, operation, phase, e);

        let (config, strategy) = self.resolve(name).map_err(wrap(Phase::Validate))?;
        strategy
            .check_prerequisites()
            .map_err(wrap(Phase::Prerequisites))?;

        let dir = self.install_dir(name);
        if paths::is_populated(&dir) {
            info!(server = %name, dir = ?dir, "Removing previous installation");
            paths.remove(&config, &dir);
        }
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_path(&dir, "removing previous installation")
                .map_err(wrap(Phase::Clean))?;
        }
        std::fs::create_dir_all(&dir)
            .with_path(&dir, "creating install directory")
            .map_err(wrap(Phase::Strategy))?;

        info!(server = %name, method = %config.method, source = %config.source, "Installing");
        let request = InstallRequest::from_config(&config, &dir);
        let produced = strategy.install(&request).map_err(wrap(Phase::Strategy))?;

        let added = paths.add(&config, &dir);
        info!(server = %name, dir = ?produced, path_entries = added, "Installed");
        Ok(dir)
    }
}

fn is_safe_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}
