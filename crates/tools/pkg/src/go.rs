use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::require_tool;
use toolshed_core::{CommandRunner, CommandSpec, InstallMethod, InstallRequest, InstallStrategy, Result};

/// Builds a Go module with `go install`, pinning `GOBIN` and `GOPATH` under
/// the install directory.
pub struct GoStrategy {
    runner: Arc<dyn CommandRunner>,
}

impl GoStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// `source` with `@latest` appended unless it already names a version.
fn versioned(source: &str) -> String {
    if source.contains('@') {
        source.to_string()
    } else {
        format!("{source}@latest")
    }
}

impl InstallStrategy for GoStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Go
    }

    fn description(&self) -> &'static str {
        "Build a Go module with go install"
    }

    fn check_prerequisites(&self) -> Result<()> {
        require_tool(self.runner.as_ref(), &["go"]).map(drop)
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let go = require_tool(self.runner.as_ref(), &["go"])?;
        let dir = request.install_dir;
        let command = CommandSpec::new("go", go)
            .arg("install")
            .arg(versioned(request.source))
            .env("GOBIN", dir.join("bin"))
            .env("GOPATH", dir.join("gopath"));
        crate::run_install(self.runner.as_ref(), command, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned() {
        assert_eq!(versioned("golang.org/x/tools/gopls"), "golang.org/x/tools/gopls@latest");
        assert_eq!(versioned("golang.org/x/tools/gopls@v0.15.3"), "golang.org/x/tools/gopls@v0.15.3");
    }
}
