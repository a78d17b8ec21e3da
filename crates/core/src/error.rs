//! Error types for toolshed operations.

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for toolshed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for toolshed operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A server configuration is missing, incomplete or invalid.
    #[error("Configuration error for '{server}': {message}")]
    #[diagnostic(code(toolshed::config::invalid))]
    Config {
        /// Server the configuration belongs to.
        server: String,
        /// Offending field, when the problem is tied to one.
        field: Option<&'static str>,
        /// Description of the problem.
        message: String,
    },

    /// A required external executable is not on the host.
    #[error("Required tool '{tool}' was not found on this system")]
    #[diagnostic(
        code(toolshed::tool::not_found),
        help("Install the tool and make sure it is on PATH")
    )]
    ToolNotFound {
        /// Name of the missing executable.
        tool: String,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} exited with {}: {stderr}", display_code(.code))]
    #[diagnostic(code(toolshed::process::failed))]
    Process {
        /// Name of the external tool.
        tool: String,
        /// Exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error (trimmed).
        stderr: String,
    },

    /// Metadata fetch or download failure.
    #[error("Network error for {url}: {message}")]
    #[diagnostic(code(toolshed::network))]
    Network {
        /// URL being fetched.
        url: String,
        /// Failure detail.
        message: String,
    },

    /// Unrecognized archive format or unusable release metadata.
    #[error("Format error: {message}")]
    #[diagnostic(code(toolshed::format))]
    Format {
        /// Failure detail.
        message: String,
    },

    /// An installed / not-installed precondition was violated.
    #[error("'{server}' {message}")]
    #[diagnostic(code(toolshed::state))]
    State {
        /// Server the precondition applies to.
        server: String,
        /// Description of the violated precondition.
        message: String,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(toolshed::io))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path involved, if any.
        path: Option<Box<Path>>,
        /// Description of the failed operation.
        operation: String,
    },

    /// A dispatcher operation failed; wraps the underlying cause.
    #[error("{operation} of '{server}' failed during {phase}: {source}")]
    #[diagnostic(code(toolshed::operation))]
    Operation {
        /// Server being operated on.
        server: String,
        /// Operation that was running.
        operation: Operation,
        /// Phase of the operation that failed.
        phase: Phase,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"))
}

/// Dispatcher operations, used to give failures context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `install`
    Install,
    /// `update`
    Update,
    /// `uninstall`
    Uninstall,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Phase of a dispatcher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Looking up and validating the server configuration.
    Validate,
    /// Checking that the strategy's external tool is available.
    Prerequisites,
    /// Removing a previous install directory.
    Clean,
    /// Running the install strategy.
    Strategy,
    /// Deleting the install directory.
    Remove,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validate => "validation",
            Self::Prerequisites => "prerequisite check",
            Self::Clean => "cleanup",
            Self::Strategy => "installation",
            Self::Remove => "directory removal",
        };
        f.write_str(s)
    }
}

/// Coarse classification of an [`Error`], ignoring dispatcher wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// [`Error::Config`]
    Config,
    /// [`Error::ToolNotFound`]
    ToolNotFound,
    /// [`Error::Process`]
    Process,
    /// [`Error::Network`]
    Network,
    /// [`Error::Format`]
    Format,
    /// [`Error::State`]
    State,
    /// [`Error::Io`]
    Io,
}

impl Error {
    /// Create a configuration error not tied to a single field.
    #[must_use]
    pub fn config(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            server: server.into(),
            field: None,
            message: message.into(),
        }
    }

    /// Create a configuration error for a specific field.
    #[must_use]
    pub fn config_field(
        server: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Config {
            server: server.into(),
            field: Some(field),
            message: message.into(),
        }
    }

    /// Create a tool-not-found error.
    #[must_use]
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a process failure error.
    #[must_use]
    pub fn process(tool: impl Into<String>, code: Option<i32>, stderr: impl AsRef<str>) -> Self {
        Self::Process {
            tool: tool.into(),
            code,
            stderr: stderr.as_ref().trim().to_string(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a format error.
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a state precondition error.
    #[must_use]
    pub fn state(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::State {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Wrap an error with dispatcher context.
    #[must_use]
    pub fn operation(
        server: impl Into<String>,
        operation: Operation,
        phase: Phase,
        source: Self,
    ) -> Self {
        Self::Operation {
            server: server.into(),
            operation,
            phase,
            source: Box::new(source),
        }
    }

    /// The innermost error, with dispatcher wrapping removed.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify the error, looking through dispatcher wrapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Config { .. } => ErrorKind::Config,
            Self::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Self::Process { .. } => ErrorKind::Process,
            Self::Network { .. } => ErrorKind::Network,
            Self::Format { .. } => ErrorKind::Format,
            Self::State { .. } => ErrorKind::State,
            // root() never returns a wrapper
            Self::Io { .. } | Self::Operation { .. } => ErrorKind::Io,
        }
    }
}

/// Attach path and operation context to an I/O result.
pub trait IoContext<T> {
    /// Convert an I/O failure into [`Error::Io`] naming `path` and `operation`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is an `Err`.
    fn with_path(self, path: &Path, operation: &str) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path(self, path: &Path, operation: &str) -> Result<T> {
        self.map_err(|e| Error::io(e, Some(path.to_path_buf()), operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_message() {
        let err = Error::process("npm", Some(1), "  ERR! 404 Not Found\n");
        assert_eq!(err.to_string(), "npm exited with exit code 1: ERR! 404 Not Found");

        let err = Error::process("go", None, "killed");
        assert_eq!(err.to_string(), "go exited with no exit code: killed");
    }

    #[test]
    fn test_operation_wrapping_keeps_kind() {
        let inner = Error::format("unsupported archive 'tool.rar'");
        let err = Error::operation("clangd", Operation::Install, Phase::Strategy, inner);

        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err.root(), Error::Format { .. }));
        assert_eq!(
            err.to_string(),
            "install of 'clangd' failed during installation: Format error: unsupported archive 'tool.rar'"
        );
    }

    #[test]
    fn test_config_field() {
        let err = Error::config_field("gopls", "source", "missing required field");
        match err {
            Error::Config { server, field, .. } => {
                assert_eq!(server, "gopls");
                assert_eq!(field, Some("source"));
            }
            _ => panic!("Expected config error"),
        }
    }

    #[test]
    fn test_io_context() {
        let result: std::io::Result<()> = Err(std::io::Error::other("boom"));
        let err = result.with_path(Path::new("/tmp/x"), "reading x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("reading x"));
    }
}
