//! Subcommand implementations.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use toolshed_core::{
    CommandRunner, ConfigStore, Installer, PathRegistry, StrategyRegistry, SystemRunner,
    TomlFileLoader, paths,
};
use toolshed_tools_github::GitHubStrategy;
use toolshed_tools_url::{BinaryStrategy, Download, HttpDownloader};
use tracing::{debug, info};

use crate::cli::{Cli, CliError, Commands};

/// Create a strategy registry covering every install method.
#[must_use]
pub fn create_registry(
    downloader: &Arc<dyn Download>,
    runner: &Arc<dyn CommandRunner>,
) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    toolshed_tools_pkg::register_all(&mut registry, runner);
    registry.register(BinaryStrategy::new(Arc::clone(downloader)));
    registry.register(GitHubStrategy::new(Arc::clone(downloader)));
    registry
}

/// Build the installer from CLI flags, environment and platform defaults.
///
/// # Errors
///
/// Returns [`CliError::Config`] if an explicit `--config` file is missing,
/// and [`CliError::Core`] if a default directory cannot be determined or the
/// HTTP client cannot be created.
pub fn build_installer(cli: &Cli) -> Result<Installer, CliError> {
    let config = match &cli.config {
        Some(path) if !path.is_file() => {
            return Err(CliError::config_with_help(
                format!("configuration file {} does not exist", path.display()),
                "Omit --config to use the default location, or create the file",
            ));
        }
        Some(path) => path.clone(),
        None => paths::config_file()?,
    };
    let root = match &cli.install_root {
        Some(path) => path.clone(),
        None => paths::install_root()?,
    };
    debug!(config = ?config, root = ?root, "Resolved locations");

    let downloader: Arc<dyn Download> = Arc::new(HttpDownloader::from_env()?);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    Ok(Installer::new(
        ConfigStore::new(TomlFileLoader::new(config)),
        create_registry(&downloader, &runner),
        root,
    ))
}

/// Asks the user to confirm destructive operations.
pub trait Confirm {
    /// Ask `question`; `true` means proceed.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Always proceeds; used for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(true)
    }
}

/// Prompts on stderr and reads a `y`/`yes` answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} [y/N] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Run one subcommand.
///
/// # Errors
///
/// Returns the installer's error, [`CliError::Partial`] if an `update-all`
/// sweep had failures, or [`CliError::Io`] if output cannot be written.
pub fn execute(
    command: &Commands,
    installer: &mut Installer,
    search_path: &mut PathRegistry,
    confirm: &mut dyn Confirm,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Commands::Install { name } => {
            let dir = installer.install(name, search_path)?;
            writeln!(out, "Installed {name} to {}", dir.display())?;
        }
        Commands::Update { name } => {
            installer.update(name, search_path)?;
            writeln!(out, "Updated {name}")?;
        }
        Commands::Uninstall { name } => {
            if !installer.is_installed(name) {
                return Err(toolshed_core::Error::state(name, "is not installed").into());
            }
            if !confirm.confirm(&format!("Uninstall {name}?"))? {
                writeln!(out, "Cancelled")?;
                return Ok(());
            }
            installer.uninstall(name, search_path)?;
            writeln!(out, "Uninstalled {name}")?;
        }
        Commands::UpdateAll => update_all(installer, search_path, confirm, out)?,
        Commands::List { json } => list(installer, *json, out)?,
        Commands::SetupPaths => {
            let added = installer.setup_paths(search_path)?;
            info!(added, "Registered installed tool directories");
            let value = search_path.to_env_value()?;
            writeln!(out, "{}", value.to_string_lossy())?;
        }
        Commands::Methods => {
            for strategy in installer.strategies().iter() {
                writeln!(out, "{:<10} {}", strategy.method().as_str(), strategy.description())?;
            }
        }
    }
    Ok(())
}

fn update_all(
    installer: &mut Installer,
    search_path: &mut PathRegistry,
    confirm: &mut dyn Confirm,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let installed = installer.installed()?;
    if installed.is_empty() {
        writeln!(out, "Nothing installed")?;
        return Ok(());
    }
    if !confirm.confirm(&format!("Update {} installed tool(s)?", installed.len()))? {
        writeln!(out, "Cancelled")?;
        return Ok(());
    }

    let report = installer.update_all(search_path)?;
    for name in &report.updated {
        writeln!(out, "Updated {name}")?;
    }
    for (name, error) in &report.failed {
        writeln!(out, "Failed {name}: {error}")?;
    }
    writeln!(
        out,
        "{} updated, {} failed",
        report.updated.len(),
        report.failed.len()
    )?;

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::Partial {
            failed: report.failed.len(),
            total: report.total(),
        })
    }
}

fn list(installer: &mut Installer, json: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let listing = installer.list()?;

    if json {
        let value = serde_json::json!({
            "available": listing.available,
            "installed": listing.installed,
        });
        writeln!(out, "{value}")?;
        return Ok(());
    }

    for name in &listing.available {
        let marker = if listing.installed.contains(name) { "*" } else { " " };
        writeln!(out, "{marker} {name}")?;
    }
    for name in listing
        .installed
        .iter()
        .filter(|name| !listing.available.contains(name))
    {
        writeln!(out, "* {name} (not configured)")?;
    }
    Ok(())
}

/// Entry point used by the binary.
///
/// # Errors
///
/// See [`execute`] and [`build_installer`].
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let mut installer = build_installer(cli)?;
    let mut search_path = PathRegistry::from_env();
    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };
    let mut out = io::stdout().lock();
    execute(
        &cli.command,
        &mut installer,
        &mut search_path,
        confirm.as_mut(),
        &mut out,
    )
}
