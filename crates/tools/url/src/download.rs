//! Blocking HTTP download client.

use reqwest::blocking::{Client, Response};
use std::fs::File;
use std::path::Path;
use toolshed_core::{Error, IoContext, Result};
use tracing::debug;

const USER_AGENT: &str = concat!("toolshed/", env!("CARGO_PKG_VERSION"));

/// Fetches remote resources.
///
/// [`HttpDownloader`] is the real implementation; tests substitute fakes
/// serving canned bytes.
pub trait Download: Send + Sync {
    /// GET `url` and return the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the host is unreachable or answers with
    /// a non-success status.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// GET `url` and write the body to `dest`. Returns the byte count.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), plus [`Error::Io`] writing `dest`.
    fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let body = self.fetch(url)?;
        std::fs::write(dest, &body).with_path(dest, "writing download")?;
        Ok(body.len() as u64)
    }
}

/// [`Download`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    token: Option<String>,
}

impl HttpDownloader {
    /// Create a client without credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::network("<client>", format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            token: None,
        })
    }

    /// Create a client that authenticates to GitHub with `GITHUB_TOKEN` or
    /// `GH_TOKEN`, if set.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_env() -> Result<Self> {
        let token = ["GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()));
        Ok(Self::new()?.with_token(token))
    }

    /// Set the GitHub bearer token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn get(&self, url: &str) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token
            && is_github_host(url)
        {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        debug!(%url, "HTTP GET");
        let response = request
            .send()
            .map_err(|e| Error::network(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("HTTP {status}")));
        }
        Ok(response)
    }
}

impl Download for HttpDownloader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.get(url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Error::network(url, format!("failed to read body: {e}")))
    }

    fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url)?;
        let mut file = File::create(dest).with_path(dest, "creating download file")?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|e| Error::network(url, format!("failed to read body: {e}")))?;
        debug!(%url, bytes, "Downloaded");
        Ok(bytes)
    }
}

/// Whether `url` points at github.com or one of its subdomains.
#[must_use]
pub fn is_github_host(url: &str) -> bool {
    let Some((_, rest)) = url.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    host == "github.com" || host.ends_with(".github.com")
}
