//! GitHub release lookup.

use serde::Deserialize;
use std::sync::Arc;
use toolshed_core::{Error, Platform, Result};
use toolshed_tools_url::Download;
use tracing::{debug, info};

use crate::scoring::{AssetCandidate, ReleaseAsset, select_asset};

/// Default GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Release metadata from the API.
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

/// Release asset. GitHub uses `browser_download_url`; mirrors and
/// compatible forges may use `download_url`.
#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    #[serde(default)]
    browser_download_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl Asset {
    fn into_release_asset(self) -> Option<ReleaseAsset> {
        let url = self.browser_download_url.or(self.download_url)?;
        Some(ReleaseAsset::new(self.name, url))
    }
}

/// Resolves `owner/repo` to the best asset of its latest release.
pub struct GitHubReleaseResolver {
    downloader: Arc<dyn Download>,
    api_base: String,
    platform: Platform,
}

impl GitHubReleaseResolver {
    /// Create a resolver against the public API for the host platform.
    #[must_use]
    pub fn new(downloader: Arc<dyn Download>) -> Self {
        Self {
            downloader,
            api_base: DEFAULT_API_BASE.to_string(),
            platform: Platform::current(),
        }
    }

    /// Use a different API base, e.g. a GitHub Enterprise host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Score assets for `platform` instead of the host.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Platform assets are scored for.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// URL of the latest-release endpoint for `repo`.
    #[must_use]
    pub fn latest_release_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, repo)
    }

    /// Fetch the asset list of the latest release of `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the API is unreachable or answers with a
    /// non-success status, and [`Error::Format`] if the body is not a release
    /// document or lists no downloadable assets.
    pub fn latest_assets(&self, repo: &str) -> Result<Vec<ReleaseAsset>> {
        let url = self.latest_release_url(repo);
        debug!(%url, "Fetching GitHub release");

        let body = self.downloader.fetch(&url)?;
        let release: Release = serde_json::from_slice(&body)
            .map_err(|e| Error::format(format!("invalid release metadata from {url}: {e}")))?;

        let tag = release.tag_name.unwrap_or_else(|| "latest".to_string());
        let assets: Vec<ReleaseAsset> = release
            .assets
            .into_iter()
            .filter_map(Asset::into_release_asset)
            .collect();
        if assets.is_empty() {
            return Err(Error::format(format!(
                "release {tag} of {repo} has no downloadable assets"
            )));
        }

        debug!(%repo, %tag, count = assets.len(), "Found release assets");
        Ok(assets)
    }

    /// Pick the best asset of `repo`'s latest release for `server`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `repo` is not `owner/repo`, otherwise the
    /// errors of [`latest_assets`](Self::latest_assets).
    pub fn resolve(&self, repo: &str, server: &str) -> Result<AssetCandidate> {
        if !is_owner_repo(repo) {
            return Err(Error::config_field(
                server,
                "source",
                format!("'{repo}' is not of the form owner/repo"),
            ));
        }
        let assets = self.latest_assets(repo)?;
        let chosen = select_asset(&assets, server, self.platform)?;
        info!(
            %server,
            %repo,
            asset = %chosen.name,
            score = chosen.score,
            platform = %self.platform,
            "Selected release asset"
        );
        Ok(chosen)
    }
}

fn is_owner_repo(repo: &str) -> bool {
    repo.split_once('/').is_some_and(|(owner, name)| {
        !owner.is_empty() && !name.is_empty() && !name.contains('/')
    })
}
