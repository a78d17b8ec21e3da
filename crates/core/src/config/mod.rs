//! Declarative per-server install specifications.
//!
//! The configuration source is opaque to the rest of the crate: anything that
//! implements [`ConfigLoader`] can feed the [`ConfigStore`]. The store parses
//! once and keeps the resulting [`ServerCatalog`] until [`ConfigStore::reload`]
//! is called.
//!
//! Records are loaded as loosely-typed [`ServerSpec`]s and only become a
//! [`ServerConfig`] after [`validate`] succeeds.
//!
//! ```toml
//! [servers.rust_analyzer]
//! install-method = "github"
//! source = "rust-lang/rust-analyzer"
//! executable = "rust-analyzer"
//! path-dirs = ["."]
//!
//! [servers.clangd]
//! install-method = "github"
//! source = "clangd/clangd"
//! executable = "bin/clangd"
//! path-dirs = ["bin"]
//! options = { strip-components = 1 }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::{Error, Result};

/// Supported install back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    /// `npm install --prefix`
    Npm,
    /// Isolated Python virtual environment.
    Pip,
    /// `go install` with `GOBIN` redirected.
    Go,
    /// `gem install --install-dir`
    Gem,
    /// `dotnet tool install --tool-path`
    Dotnet,
    /// `cs install --install-dir`
    Coursier,
    /// Latest GitHub release asset.
    Github,
    /// Direct file download.
    Binary,
}

impl InstallMethod {
    /// Every supported method, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Npm,
        Self::Pip,
        Self::Go,
        Self::Gem,
        Self::Dotnet,
        Self::Coursier,
        Self::Github,
        Self::Binary,
    ];

    /// Configuration spelling of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pip => "pip",
            Self::Go => "go",
            Self::Gem => "gem",
            Self::Dotnet => "dotnet",
            Self::Coursier => "coursier",
            Self::Github => "github",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unsupported install method '{s}'"))
    }
}

/// Optional knobs for download-based methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallOptions {
    /// Extract archives into this subdirectory of the install directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
    /// Leading path segments to drop from tar entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_components: Option<usize>,
}

/// A server record as loaded, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerSpec {
    /// Unique server name. Taken from the table key when loaded from TOML.
    #[serde(skip)]
    pub name: String,
    /// Install method spelling, e.g. `"npm"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_method: Option<String>,
    /// Package spec, `owner/repo`, or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Path of the produced executable, relative to the install directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// Search-path patterns; checked to be a list of strings by [`validate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_dirs: Option<serde_json::Value>,
    /// Download options.
    #[serde(default)]
    pub options: InstallOptions,
}

impl ServerSpec {
    /// Create a fully populated spec.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        source: impl Into<String>,
        executable: impl Into<String>,
        path_dirs: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            install_method: Some(method.into()),
            source: Some(source.into()),
            executable: Some(executable.into()),
            path_dirs: Some(serde_json::Value::from(path_dirs.to_vec())),
            options: InstallOptions::default(),
        }
    }

    /// Set download options.
    #[must_use]
    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }
}

/// A validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Unique server name.
    pub name: String,
    /// Install back-end.
    pub method: InstallMethod,
    /// Package spec, `owner/repo`, or URL.
    pub source: String,
    /// Path of the produced executable, relative to the install directory.
    pub executable: String,
    /// Non-empty ordered list of search-path patterns.
    pub path_dirs: Vec<String>,
    /// Download options.
    pub options: InstallOptions,
}

fn present<'a>(name: &str, field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::config_field(name, field, format!("missing required field '{field}'"))),
    }
}

/// Check a loaded record and turn it into a [`ServerConfig`].
///
/// # Errors
///
/// Returns [`Error::Config`] if the record is absent, if any of
/// `install-method`, `source`, `executable` or `path-dirs` is missing, if the
/// method is not supported, or if `path-dirs` is not a non-empty list of
/// strings. The error names the offending field.
pub fn validate(name: &str, spec: Option<&ServerSpec>) -> Result<ServerConfig> {
    let spec = spec.ok_or_else(|| Error::config(name, "no configuration found"))?;

    let method = present(name, "install-method", spec.install_method.as_deref())?;
    let source = present(name, "source", spec.source.as_deref())?;
    let executable = present(name, "executable", spec.executable.as_deref())?;
    let path_dirs = spec
        .path_dirs
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            Error::config_field(name, "path-dirs", "missing required field 'path-dirs'")
        })?;

    let method = method
        .parse::<InstallMethod>()
        .map_err(|e| Error::config_field(name, "install-method", e))?;

    let not_a_list =
        || Error::config_field(name, "path-dirs", "'path-dirs' must be a list of strings");
    let path_dirs = path_dirs
        .as_array()
        .ok_or_else(not_a_list)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(not_a_list))
        .collect::<Result<Vec<_>>>()?;
    if path_dirs.is_empty() {
        return Err(Error::config_field(
            name,
            "path-dirs",
            "'path-dirs' must list at least one directory",
        ));
    }

    Ok(ServerConfig {
        name: name.to_string(),
        method,
        source: source.to_string(),
        executable: executable.to_string(),
        path_dirs,
        options: spec.options.clone(),
    })
}

/// Source of server records.
pub trait ConfigLoader: Send + Sync {
    /// Short description used in logs (e.g. the file path).
    fn describe(&self) -> String;

    /// Parse every server record.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> Result<Vec<ServerSpec>>;
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    servers: BTreeMap<String, ServerSpec>,
}

/// Loads `[servers.<name>]` tables from a TOML file.
///
/// A missing file is an empty configuration.
#[derive(Debug, Clone)]
pub struct TomlFileLoader {
    path: PathBuf,
}

impl TomlFileLoader {
    /// Create a loader for the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the configuration file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigLoader for TomlFileLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<ServerSpec>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No configuration file, using empty catalog");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::io(
                    e,
                    Some(self.path.clone()),
                    "reading server configuration",
                ));
            }
        };

        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            Error::config(self.describe(), format!("failed to parse configuration: {e}"))
        })?;

        Ok(file
            .servers
            .into_iter()
            .map(|(name, mut spec)| {
                spec.name = name;
                spec
            })
            .collect())
    }
}

/// In-memory loader, for embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    specs: Vec<ServerSpec>,
}

impl StaticLoader {
    /// Create a loader that always yields `specs`.
    #[must_use]
    pub fn new(specs: Vec<ServerSpec>) -> Self {
        Self { specs }
    }
}

impl ConfigLoader for StaticLoader {
    fn describe(&self) -> String {
        format!("{} static server(s)", self.specs.len())
    }

    fn load(&self) -> Result<Vec<ServerSpec>> {
        Ok(self.specs.clone())
    }
}

/// Parsed set of server records, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ServerCatalog {
    servers: BTreeMap<String, ServerSpec>,
}

impl ServerCatalog {
    /// Build a catalog, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if two records share a name.
    pub fn from_specs(specs: Vec<ServerSpec>) -> Result<Self> {
        let mut servers = BTreeMap::new();
        for spec in specs {
            if servers.contains_key(&spec.name) {
                return Err(Error::config(&spec.name, "server is defined more than once"));
            }
            servers.insert(spec.name.clone(), spec);
        }
        Ok(Self { servers })
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServerSpec> {
        self.servers.get(name)
    }

    /// All server names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Caching front for a [`ConfigLoader`].
pub struct ConfigStore {
    loader: Box<dyn ConfigLoader>,
    cache: Option<Arc<ServerCatalog>>,
}

impl ConfigStore {
    /// Create a store. Nothing is parsed until [`load`](Self::load).
    #[must_use]
    pub fn new(loader: impl ConfigLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cache: None,
        }
    }

    /// Return the cached catalog, parsing the source on first use.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, or [`Error::Config`] for duplicate names.
    pub fn load(&mut self) -> Result<Arc<ServerCatalog>> {
        if let Some(catalog) = &self.cache {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(ServerCatalog::from_specs(self.loader.load()?)?);
        debug!(
            source = %self.loader.describe(),
            servers = catalog.len(),
            "Loaded server configuration"
        );
        self.cache = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Discard the cache and parse the source again.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load). On error the cache stays empty.
    pub fn reload(&mut self) -> Result<Arc<ServerCatalog>> {
        self.cache = None;
        self.load()
    }

    /// Exact-match lookup, loading on first use.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn get(&mut self, name: &str) -> Result<Option<ServerSpec>> {
        Ok(self.load()?.get(name).cloned())
    }

    /// Whether a catalog is currently cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("source", &self.loader.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
