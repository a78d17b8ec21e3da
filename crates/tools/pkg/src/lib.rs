//! Package-manager install methods for toolshed.
//!
//! Each strategy drives one external package manager through a
//! [`CommandRunner`], installing into the tool's own directory so nothing
//! touches global package state:
//!
//! | Method | Tool | Layout |
//! |--------|------|--------|
//! | `npm` | `npm` | `node_modules/.bin/` |
//! | `pip` | `python3` / `python` | `venv/bin/` (`venv\Scripts\` on Windows) |
//! | `go` | `go` | `bin/` |
//! | `gem` | `gem` | `bin/` |
//! | `dotnet` | `dotnet` | tool directory root |
//! | `coursier` | `cs` / `coursier` | `bin/` |

mod coursier;
mod dotnet;
mod gem;
mod go;
mod npm;
mod pip;

use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::process::run_checked;
use toolshed_core::{CommandRunner, CommandSpec, InstallRequest, Result, StrategyRegistry};
use tracing::{info, warn};

pub use coursier::CoursierStrategy;
pub use dotnet::DotnetStrategy;
pub use gem::GemStrategy;
pub use go::GoStrategy;
pub use npm::NpmStrategy;
pub use pip::PipStrategy;

/// Register all six package-manager strategies sharing `runner`.
pub fn register_all(registry: &mut StrategyRegistry, runner: &Arc<dyn CommandRunner>) {
    registry.register(NpmStrategy::new(Arc::clone(runner)));
    registry.register(PipStrategy::new(Arc::clone(runner)));
    registry.register(GoStrategy::new(Arc::clone(runner)));
    registry.register(GemStrategy::new(Arc::clone(runner)));
    registry.register(DotnetStrategy::new(Arc::clone(runner)));
    registry.register(CoursierStrategy::new(Arc::clone(runner)));
}

/// Run the final install command inside the install directory and hand the
/// directory back.
fn run_install(
    runner: &dyn CommandRunner,
    command: CommandSpec,
    request: &InstallRequest<'_>,
) -> Result<PathBuf> {
    let command = command.current_dir(request.install_dir);
    info!(server = %request.name, tool = %command.tool, source = %request.source, "Running package manager");
    run_checked(runner, &command)?;

    let exe = request.executable_path();
    if !exe.exists() {
        warn!(server = %request.name, executable = ?exe, "Declared executable was not produced");
    }
    Ok(request.install_dir.to_path_buf())
}
