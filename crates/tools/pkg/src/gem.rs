use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::require_tool;
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};

/// Installs a Ruby gem with its own `GEM_HOME`.
pub struct GemStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl GemStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl InstallStrategy for GemStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Gem
    }

    fn description(&self) -> &'static str {
        "Install a Ruby gem into an isolated gem home"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), &["gem"]).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let gem = require_tool(self.runner.as_ref(), &["gem"])?;
        let dir = request.install_dir;
        let command = CommandSpec::new("gem", gem)
            .args(["install", "--no-document", "--install-dir"])
            .arg(dir)
            .arg("--bindir")
            .arg(dir.join("bin"))
            .arg(request.source)
            .env("GEM_HOME", dir);
        crate::run_install(self.runner.as_ref(), command, request)
    }
}
