//! Blocking external-process abstraction.
//!
//! Strategies never spawn processes directly; they build a [`CommandSpec`]
//! and hand it to a [`CommandRunner`]. [`SystemRunner`] is the real
//! implementation. Tests substitute a recording fake.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

use crate::{Error, Result};

/// A fully specified process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Display name of the tool, used in errors (e.g. `"npm"`).
    pub tool: String,
    /// Program to execute, usually a resolved absolute path.
    pub program: PathBuf,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Extra environment variables.
    pub envs: Vec<(OsString, OsString)>,
    /// Working directory.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Start a spec for `program`, reported in errors as `tool`.
    #[must_use]
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Arguments as lossy strings, for logging and assertions.
    #[must_use]
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external processes to completion.
pub trait CommandRunner: Send + Sync {
    /// Resolve an executable name to a path on the host.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Run the command, blocking until it exits.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned. A non-zero
    /// exit is reported through [`CommandOutput::code`].
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process` and `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        debug!(
            tool = %command.tool,
            program = ?command.program,
            args = ?command.args_lossy(),
            "Running external tool"
        );

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| {
            Error::io(
                e,
                Some(command.program.clone()),
                format!("spawning {}", command.tool),
            )
        })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(tool = %command.tool, code = ?result.code, "External tool finished");
        Ok(result)
    }
}

/// Resolve the first available executable among `candidates`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] naming the first candidate if none resolve.
pub fn require_tool(runner: &dyn CommandRunner, candidates: &[&str]) -> Result<PathBuf> {
    candidates
        .iter()
        .find_map(|name| runner.resolve(name))
        .ok_or_else(|| Error::tool_not_found(candidates.first().copied().unwrap_or_default()))
}

/// Run a command and turn a non-zero exit into [`Error::Process`].
///
/// # Errors
///
/// Returns the spawn error, or [`Error::Process`] with the exit code and
/// captured stderr.
pub fn run_checked(runner: &dyn CommandRunner, command: &CommandSpec) -> Result<CommandOutput> {
    let output = runner.run(command)?;
    if !output.success() {
        let detail = if output.stderr.trim().is_empty() {
            &output.stdout
        } else {
            &output.stderr
        };
        return Err(Error::process(&command.tool, output.code, detail));
    }
    Ok(output)
}

/// Path to `name` inside `dir`, with `.exe` appended on Windows.
#[must_use]
pub fn executable_in(dir: &Path, name: &str) -> PathBuf {
    if cfg!(windows) {
        dir.join(format!("{name}.exe"))
    } else {
        dir.join(name)
    }
}
