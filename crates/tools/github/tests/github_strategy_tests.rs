//! Release resolution and install tests against a canned API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;
use toolshed_core::{
    Arch, Error, ErrorKind, InstallOptions, InstallRequest, InstallStrategy, Os, Platform, Result,
};
use toolshed_tools_github::{GitHubReleaseResolver, GitHubStrategy};
use toolshed_tools_url::Download;

const API: &str = "https://ghe.example.com/api/v3";
const LINUX_X64: Platform = Platform::new(Os::Linux, Arch::X86_64);

#[derive(Default)]
struct FakeApi {
    routes: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl FakeApi {
    fn route(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), body.into());
        self
    }
}

impl Download for FakeApi {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| Error::network(url, "HTTP 404 Not Found"))
    }
}

fn release_json(assets: &[&str]) -> String {
    let assets: Vec<serde_json::Value> = assets
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "browser_download_url": format!("https://dl.example.com/{name}"),
                "size": 1234,
            })
        })
        .collect();
    serde_json::json!({ "tag_name": "v1.2.3", "assets": assets }).to_string()
}

fn latest(repo: &str) -> String {
    format!("{API}/repos/{repo}/releases/latest")
}

fn resolver(api: FakeApi) -> (Arc<FakeApi>, GitHubReleaseResolver) {
    let api = Arc::new(api);
    let resolver = GitHubReleaseResolver::new(Arc::clone(&api) as Arc<dyn Download>)
        .with_api_base(format!("{API}/"))
        .with_platform(LINUX_X64);
    (api, resolver)
}

#[test]
fn test_resolve_picks_best_asset() {
    let (_, resolver) = resolver(FakeApi::default().route(
        &latest("acme/tool"),
        release_json(&[
            "tool-darwin-amd64.tar.gz",
            "tool-linux-amd64-debug.tar.gz",
            "tool-linux-amd64.tar.gz",
            "tool-windows-amd64.zip",
        ]),
    ));

    let chosen = resolver.resolve("acme/tool", "tool").unwrap();
    assert_eq!(chosen.name, "tool-linux-amd64.tar.gz");
    assert_eq!(chosen.url, "https://dl.example.com/tool-linux-amd64.tar.gz");
    assert_eq!(chosen.score, 15);
}

#[test]
fn test_missing_release_is_network_error() {
    let (_, resolver) = resolver(FakeApi::default());
    let err = resolver.resolve("acme/none", "tool").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[test]
fn test_empty_assets_is_format_error() {
    let (_, resolver) =
        resolver(FakeApi::default().route(&latest("acme/tool"), release_json(&[])));
    let err = resolver.resolve("acme/tool", "tool").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().contains("v1.2.3"));
}

#[test]
fn test_invalid_metadata_is_format_error() {
    let (_, resolver) =
        resolver(FakeApi::default().route(&latest("acme/tool"), "<html>rate limited</html>"));
    let err = resolver.resolve("acme/tool", "tool").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_bad_repo_is_rejected_without_request() {
    let (api, resolver) = resolver(FakeApi::default());
    let err = resolver.resolve("just-a-name", "tool").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(api.requested.lock().unwrap().is_empty());
}

#[test]
fn test_strategy_downloads_and_extracts_selected_asset() {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_path("tool-1.2.3/tool").unwrap();
    header.set_size(2);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, &b"ok"[..]).unwrap();
    let archive = builder.into_inner().unwrap().finish().unwrap();

    let api = Arc::new(
        FakeApi::default()
            .route(
                &latest("acme/tool"),
                release_json(&["tool-windows-amd64.zip", "tool-linux-amd64.tar.gz"]),
            )
            .route("https://dl.example.com/tool-linux-amd64.tar.gz", archive),
    );
    let downloader: Arc<dyn Download> = Arc::clone(&api) as Arc<dyn Download>;
    let strategy = GitHubStrategy::new(Arc::clone(&downloader)).with_resolver(
        GitHubReleaseResolver::new(downloader)
            .with_api_base(API)
            .with_platform(LINUX_X64),
    );

    let temp = TempDir::new().unwrap();
    let options = InstallOptions {
        subdir: None,
        strip_components: Some(1),
    };
    let request = InstallRequest {
        name: "tool",
        source: "acme/tool",
        executable: "tool",
        options: &options,
        install_dir: temp.path(),
    };
    strategy.install(&request).unwrap();

    assert_eq!(std::fs::read(temp.path().join("tool")).unwrap(), b"ok");
    assert_eq!(
        *api.requested.lock().unwrap(),
        vec![
            latest("acme/tool"),
            "https://dl.example.com/tool-linux-amd64.tar.gz".to_string(),
        ]
    );
}
