use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::require_tool;
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};

/// Installs a .NET tool with `dotnet tool install --tool-path`.
pub struct DotnetStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl DotnetStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl InstallStrategy for DotnetStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Dotnet
    }

    fn description(&self) -> &'static str {
        "Install a .NET tool into a tool path"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), &["dotnet"]).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let dotnet = require_tool(self.runner.as_ref(), &["dotnet"])?;
        let command = CommandSpec::new("dotnet", dotnet)
            .args(["tool", "install", "--tool-path"])
            .arg(request.install_dir)
            .arg(request.source);
        crate::run_install(self.runner.as_ref(), command, request)
    }
}
