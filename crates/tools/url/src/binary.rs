//! The `binary` install method.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use toolshed_core::{Error, InstallMethod, InstallRequest, InstallStrategy, IoContext, Result};
use tracing::{debug, info, warn};

use crate::download::Download;
use crate::extract::{ArchiveFormat, extract_as};

/// Installs a file downloaded from an explicit URL.
///
/// Archives are extracted into the install directory (or `options.subdir`
/// beneath it); anything else is copied in as the executable.
pub struct BinaryStrategy {
    downloader: Arc<dyn Download>,
}

impl BinaryStrategy {
    /// Create a strategy downloading through `downloader`.
    #[must_use]
    pub fn new(downloader: Arc<dyn Download>) -> Self {
        Self { downloader }
    }

    /// Download `url` and install it as described by `request`.
    ///
    /// Shared with the `github` method once it has resolved an asset URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] for download failures, [`Error::Format`] for
    /// corrupt archives or URLs without a file name, and [`Error::Io`] for
    /// filesystem failures.
    pub fn install_from(&self, url: &str, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let file_name = file_name_from_url(url)?;
        let scratch = tempfile::Builder::new()
            .prefix("toolshed-")
            .tempdir()
            .map_err(|e| Error::io(e, None, "creating scratch directory"))?;
        let download = scratch.path().join(&file_name);

        info!(server = %request.name, %url, "Downloading");
        let bytes = self.downloader.download_to(url, &download)?;
        debug!(server = %request.name, bytes, file = %file_name, "Download complete");

        if let Some(format) = ArchiveFormat::detect(&file_name) {
            let dest = match request.options.subdir.as_deref() {
                Some(subdir) => request.install_dir.join(relative(request.name, subdir)?),
                None => request.install_dir.to_path_buf(),
            };
            let strip = request.options.strip_components.unwrap_or(0);
            extract_as(format, &download, &dest, strip)?;

            let exe = request.executable_path();
            if exe.is_file() {
                make_executable(&exe)?;
            } else {
                warn!(server = %request.name, executable = ?exe, "Declared executable not found in archive");
            }
        } else {
            let base = Path::new(request.executable).file_name().ok_or_else(|| {
                Error::config_field(
                    request.name,
                    "executable",
                    format!("'{}' has no file name", request.executable),
                )
            })?;
            let target = request.install_dir.join(base);
            std::fs::copy(&download, &target).with_path(&target, "copying download")?;
            make_executable(&target)?;
        }

        Ok(request.install_dir.to_path_buf())
    }
}

impl InstallStrategy for BinaryStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Binary
    }

    fn description(&self) -> &'static str {
        "Download a file or archive from a URL"
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        self.install_from(request.source, request)
    }
}

/// Last path segment of `url`, ignoring query and fragment.
///
/// # Errors
///
/// Returns [`Error::Format`] if the URL path ends without a file name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    match path.split_once('/').map(|(_, p)| p.rsplit('/').next().unwrap_or_default()) {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name.to_string()),
        _ => Err(Error::format(format!("cannot determine file name from URL '{url}'"))),
    }
}

fn relative<'a>(name: &str, subdir: &'a str) -> Result<&'a Path> {
    let path = Path::new(subdir);
    if path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        Ok(path)
    } else {
        Err(Error::config_field(
            name,
            "subdir",
            format!("'{subdir}' must be a relative path inside the install directory"),
        ))
    }
}

/// Add execute permission for everyone. No-op on non-Unix hosts.
///
/// # Errors
///
/// Returns [`Error::Io`] if the permissions cannot be read or written.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .with_path(path, "reading permissions")?
            .permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms).with_path(path, "setting permissions")?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
