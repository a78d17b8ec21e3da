//! Centralized path management for toolshed directories.
//!
//! | Platform | Install root | Config file |
//! |----------|--------------|-------------|
//! | **macOS** | `~/Library/Application Support/toolshed/servers` | `~/Library/Application Support/toolshed/servers.toml` |
//! | **Linux** | `~/.local/share/toolshed/servers` (XDG_DATA_HOME) | `~/.config/toolshed/servers.toml` (XDG_CONFIG_HOME) |
//! | **Windows** | `%APPDATA%\toolshed\servers` | `%APPDATA%\toolshed\servers.toml` |
//!
//! Both support environment variable overrides for testing and CI:
//! - `TOOLSHED_INSTALL_DIR` - Override install root
//! - `TOOLSHED_CONFIG` - Override configuration file

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the install root.
pub const INSTALL_DIR_ENV: &str = "TOOLSHED_INSTALL_DIR";
/// Environment variable overriding the configuration file.
pub const CONFIG_ENV: &str = "TOOLSHED_CONFIG";

/// Get the root directory under which every tool gets `<name>/`.
///
/// Resolution order:
/// 1. `TOOLSHED_INSTALL_DIR` environment variable
/// 2. Platform data directory + `/toolshed/servers`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn install_root() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(INSTALL_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::data_dir()
        .ok_or_else(|| Error::config("toolshed", "could not determine data directory"))?;

    Ok(base.join("toolshed").join("servers"))
}

/// Get the path of the server configuration file.
///
/// Resolution order:
/// 1. `TOOLSHED_CONFIG` environment variable
/// 2. Platform config directory + `/toolshed/servers.toml`
///
/// # Errors
///
/// Returns an error if the config directory cannot be determined.
pub fn config_file() -> Result<PathBuf> {
    if let Ok(file) = std::env::var(CONFIG_ENV)
        && !file.is_empty()
    {
        return Ok(PathBuf::from(file));
    }

    let base = dirs::config_dir()
        .ok_or_else(|| Error::config("toolshed", "could not determine config directory"))?;

    Ok(base.join("toolshed").join("servers.toml"))
}

/// Whether `dir` holds an installed tool: it exists and has at least one
/// entry whose name does not start with `.`.
#[must_use]
pub fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(std::result::Result::ok)
            .any(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_root_default() {
        temp_env::with_var_unset(INSTALL_DIR_ENV, || {
            let dir = install_root().expect("install_root should succeed");
            assert!(dir.ends_with("toolshed/servers"), "Unexpected: {:?}", dir);
        });
    }

    #[test]
    fn test_install_root_override() {
        let test_dir = "/tmp/toolshed-test-servers";
        temp_env::with_var(INSTALL_DIR_ENV, Some(test_dir), || {
            let dir = install_root().expect("install_root should succeed");
            assert_eq!(dir, PathBuf::from(test_dir));
        });
    }

    #[test]
    fn test_install_root_empty_override_ignored() {
        temp_env::with_var(INSTALL_DIR_ENV, Some(""), || {
            let dir = install_root().expect("install_root should succeed");
            assert!(dir.ends_with("toolshed/servers"), "Unexpected: {:?}", dir);
        });
    }

    #[test]
    fn test_config_file_default() {
        temp_env::with_var_unset(CONFIG_ENV, || {
            let file = config_file().expect("config_file should succeed");
            assert!(file.ends_with("toolshed/servers.toml"), "Unexpected: {:?}", file);
        });
    }

    #[test]
    fn test_config_file_override() {
        temp_env::with_var(CONFIG_ENV, Some("/etc/toolshed.toml"), || {
            assert_eq!(config_file().unwrap(), PathBuf::from("/etc/toolshed.toml"));
        });
    }

    #[test]
    fn test_is_populated() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("tool");
        assert!(!is_populated(&dir));

        std::fs::create_dir(&dir).unwrap();
        assert!(!is_populated(&dir));

        std::fs::write(dir.join(".partial"), b"").unwrap();
        assert!(!is_populated(&dir));

        std::fs::create_dir(dir.join("bin")).unwrap();
        assert!(is_populated(&dir));
    }
}
