use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::require_tool;
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};

/// Installs an npm package into `<dir>/node_modules`.
pub struct NpmStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl NpmStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl InstallStrategy for NpmStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Npm
    }

    fn description(&self) -> &'static str {
        "Install an npm package with a local prefix"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), &["npm"]).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let npm = require_tool(self.runner.as_ref(), &["npm"])?;
        let command = CommandSpec::new("npm", npm)
            .args(["install", "--prefix"])
            .arg(request.install_dir)
            .args(["--no-audit", "--no-fund", "--no-save"])
            .arg(request.source);
        crate::run_install(self.runner.as_ref(), command, request)
    }
}
