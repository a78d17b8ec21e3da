use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolshed_core::process::{executable_in, require_tool, run_checked};
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};
use tracing::debug;

const PYTHONS: &[&str] = &["python3", "python"];

/// Installs a Python package into a private virtual environment at
/// `<dir>/venv`.
pub struct PipStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl PipStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Directory holding the venv's scripts.
fn scripts_dir(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

impl InstallStrategy for PipStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Pip
    }

    fn description(&self) -> &'static str {
        "Install a Python package into a virtual environment"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), PYTHONS).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let python = require_tool(self.runner.as_ref(), PYTHONS)?;
        let venv = request.install_dir.join("venv");

        let create = CommandSpec::new("python", python)
            .args(["-m", "venv"])
            .arg(&venv)
            .current_dir(request.install_dir);
        run_checked(self.runner.as_ref(), &create)?;
        debug!(server = %request.name, venv = ?venv, "Created virtual environment");

        let pip = executable_in(&scripts_dir(&venv), "pip");
        let command = CommandSpec::new("pip", pip)
            .arg("install")
            .arg(request.source);
        crate::run_install(self.runner.as_ref(), command, request)
    }
}
