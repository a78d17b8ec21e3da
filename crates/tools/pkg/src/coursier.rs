use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::require_tool;
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};

const CANDIDATES: &[&str] = &["cs", "coursier"];

/// Installs a JVM application with coursier.
pub struct CoursierStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl CoursierStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl InstallStrategy for CoursierStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Coursier
    }

    fn description(&self) -> &'static str {
        "Install a JVM application with coursier"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), CANDIDATES).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let cs = require_tool(self.runner.as_ref(), CANDIDATES)?;
        let command = CommandSpec::new("coursier", cs)
            .args(["install", "--install-dir"])
            .arg(request.install_dir.join("bin"))
            .arg(request.source);
        crate::run_install(self.runner.as_ref(), command, request)
    }
}
