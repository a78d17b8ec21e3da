//! Search-path registry.
//!
//! [`PathRegistry`] is an ordered, duplicate-free list of directories owned
//! by the host process. The dispatcher adds a tool's expanded `path-dirs`
//! after a successful install and removes the same expansion on uninstall.
//! Because both directions use [`expand_path_dirs`] against the same
//! on-disk layout, `add` followed by `remove` restores the previous
//! membership exactly.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::{Error, Result};

const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Expand `patterns` against `install_dir`.
///
/// Patterns containing a wildcard are glob-expanded and only directories are
/// kept. Literal patterns are kept if they resolve to an existing directory.
/// Input order is preserved; patterns that match nothing contribute nothing.
#[must_use]
pub fn expand_path_dirs(install_dir: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for pattern in patterns {
        if pattern.contains(WILDCARDS) {
            expanded.extend(glob_dirs(install_dir, pattern));
        } else {
            let candidate = normalize(&install_dir.join(pattern));
            if candidate.is_dir() {
                expanded.push(candidate);
            }
        }
    }
    expanded
}

fn glob_dirs(install_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let Some(base) = install_dir.to_str() else {
        warn!(dir = ?install_dir, %pattern, "Install directory is not UTF-8, skipping glob");
        return Vec::new();
    };
    let full = format!("{}/{}", glob::Pattern::escape(base), pattern);

    match glob::glob(&full) {
        Ok(paths) => paths
            .filter_map(std::result::Result::ok)
            .filter(|p| p.is_dir())
            .map(|p| normalize(&p))
            .collect(),
        Err(e) => {
            warn!(%pattern, error = %e, "Invalid path-dirs pattern");
            Vec::new()
        }
    }
}

// Drops interior `.` segments so "dir/." and "dir" compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Ordered, duplicate-free collection of search-path directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRegistry {
    entries: Vec<PathBuf>,
}

impl PathRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from existing entries, dropping duplicates.
    #[must_use]
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut registry = Self::new();
        for entry in entries {
            registry.push(entry.into());
        }
        registry
    }

    /// Seed from a `PATH`-style value.
    #[must_use]
    pub fn from_os_str(value: &OsStr) -> Self {
        Self::from_entries(std::env::split_paths(value))
    }

    /// Seed from the current process's `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var_os("PATH").map_or_else(Self::new, |v| Self::from_os_str(&v))
    }

    /// Current entries, in order.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Whether `path` is present.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e == path)
    }

    /// Append `path` unless present. Returns whether it was added.
    pub fn push(&mut self, path: PathBuf) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Remove `path`. Returns whether it was present.
    pub fn remove_entry(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != path);
        self.entries.len() != before
    }

    /// Register the expanded `path-dirs` of `config` under `install_dir`.
    ///
    /// Returns the number of entries that were not already present.
    pub fn add(&mut self, config: &ServerConfig, install_dir: &Path) -> usize {
        let added = expand_path_dirs(install_dir, &config.path_dirs)
            .into_iter()
            .filter(|dir| self.push(dir.clone()))
            .count();
        debug!(server = %config.name, added, "Registered search-path entries");
        added
    }

    /// Remove the expanded `path-dirs` of `config` under `install_dir`.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, config: &ServerConfig, install_dir: &Path) -> usize {
        let removed = expand_path_dirs(install_dir, &config.path_dirs)
            .iter()
            .filter(|dir| self.remove_entry(dir))
            .count();
        debug!(server = %config.name, removed, "Removed search-path entries");
        removed
    }

    /// Join the entries into a `PATH`-style value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if an entry contains the platform separator.
    pub fn to_env_value(&self) -> Result<OsString> {
        std::env::join_paths(&self.entries)
            .map_err(|e| Error::format(format!("search path cannot be joined: {e}")))
    }
}
