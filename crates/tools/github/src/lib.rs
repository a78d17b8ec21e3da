//! GitHub Releases install method for toolshed.
//!
//! Looks up the latest release of an `owner/repo` source, scores each asset
//! against the host platform (see [`score_asset`]) and installs the winner
//! through the `binary` method's download and extraction path.

mod resolver;
mod scoring;

use std::path::PathBuf;
use std::sync::Arc;
use toolshed_core::{InstallMethod, InstallRequest, InstallStrategy, Result};
use toolshed_tools_url::{BinaryStrategy, Download};

pub use resolver::{DEFAULT_API_BASE, GitHubReleaseResolver};
pub use scoring::{AssetCandidate, ReleaseAsset, score_asset, select_asset};

/// The `github` install method.
pub struct GitHubStrategy {
    resolver: GitHubReleaseResolver,
    binary: BinaryStrategy,
}

impl GitHubStrategy {
    /// Create a strategy using the public API and the host platform.
    #[must_use]
    pub fn new(downloader: Arc<dyn Download>) -> Self {
        Self {
            resolver: GitHubReleaseResolver::new(Arc::clone(&downloader)),
            binary: BinaryStrategy::new(downloader),
        }
    }

    /// Replace the resolver, e.g. to point at another API base.
    #[must_use]
    pub fn with_resolver(mut self, resolver: GitHubReleaseResolver) -> Self {
        self.resolver = resolver;
        self
    }
}

impl InstallStrategy for GitHubStrategy {
    fn method(&self) -> InstallMethod {
        InstallMethod::Github
    }

    fn description(&self) -> &'static str {
        "Download the best-matching asset of a GitHub release"
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let asset = self.resolver.resolve(request.source, request.name)?;
        self.binary.install_from(&asset.url, request)
    }
}
