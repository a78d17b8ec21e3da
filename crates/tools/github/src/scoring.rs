//! Release asset scoring.
//!
//! Scores are pure functions of (asset name, server name, platform). All
//! matching is case-insensitive substring matching.

use toolshed_core::{Error, Platform, Result};

/// A downloadable artifact attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name, e.g. `clangd-linux-18.1.3.zip`.
    pub name: String,
    /// Download URL.
    pub url: String,
}

impl ReleaseAsset {
    /// Create an asset.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// The asset chosen for a host, with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCandidate {
    /// Asset file name.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// Score that won selection.
    pub score: i32,
}

const OS_MATCH: i32 = 10;
const ARCH_MATCH: i32 = 5;
const NON_RUNTIME: i32 = -20;
const OMNISHARP_VARIANT: i32 = -15;
const CLANGD_INDEXING_TOOLS: i32 = -30;

/// Score `asset_name` for `server` on `platform`.
///
/// The architecture bonus only counts when the OS also matched, so an asset
/// for the right CPU but the wrong OS scores no better than an unrelated one.
#[must_use]
pub fn score_asset(asset_name: &str, server: &str, platform: Platform) -> i32 {
    let name = asset_name.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| name.contains(m));
    let mut score = 0;

    if has_any(platform.os.markers()) {
        score += OS_MATCH;
        if has_any(platform.arch.markers()) {
            score += ARCH_MATCH;
        }
    }
    if has_any(&["source", "debug", "symbols"]) {
        score += NON_RUNTIME;
    }
    match server {
        "omnisharp" if has_any(&["http", "mono"]) => score += OMNISHARP_VARIANT,
        "clangd" if is_indexing_tools(&name) => score += CLANGD_INDEXING_TOOLS,
        _ => {}
    }
    score
}

// "indexing", any one character, then "tools".
fn is_indexing_tools(name: &str) -> bool {
    const PREFIX: &str = "indexing";
    name.match_indices(PREFIX).any(|(i, _)| {
        let mut rest = name[i + PREFIX.len()..].chars();
        rest.next().is_some() && rest.as_str().starts_with("tools")
    })
}

/// Pick the highest-scoring asset; ties go to the earliest in `assets`.
///
/// # Errors
///
/// Returns [`Error::Format`] if `assets` is empty.
pub fn select_asset(
    assets: &[ReleaseAsset],
    server: &str,
    platform: Platform,
) -> Result<AssetCandidate> {
    let mut best: Option<AssetCandidate> = None;
    for asset in assets {
        let score = score_asset(&asset.name, server, platform);
        tracing::trace!(asset = %asset.name, score, "Scored release asset");
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(AssetCandidate {
                name: asset.name.clone(),
                url: asset.url.clone(),
                score,
            });
        }
    }
    best.ok_or_else(|| Error::format(format!("no release assets to choose from for '{server}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use toolshed_core::{Arch, Os};

    const LINUX_X64: Platform = Platform::new(Os::Linux, Arch::X86_64);

    fn assets(names: &[&str]) -> Vec<ReleaseAsset> {
        names
            .iter()
            .map(|n| ReleaseAsset::new(*n, format!("https://example.com/{n}")))
            .collect()
    }

    #[test]
    fn test_reference_vector() {
        let names = [
            "tool-linux-amd64.tar.gz",
            "tool-darwin-amd64.tar.gz",
            "tool-windows-amd64.zip",
            "tool-linux-amd64-debug.tar.gz",
        ];
        let scores: Vec<i32> = names
            .iter()
            .map(|n| score_asset(n, "tool", LINUX_X64))
            .collect();
        assert_eq!(scores, vec![15, 0, 0, -5]);

        let chosen = select_asset(&assets(&names), "tool", LINUX_X64).unwrap();
        assert_eq!(chosen.name, "tool-linux-amd64.tar.gz");
        assert_eq!(chosen.score, 15);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(score_asset("Tool-Linux-X86_64.TAR.GZ", "tool", LINUX_X64), 15);
    }

    #[test]
    fn test_os_only_match() {
        assert_eq!(score_asset("tool-linux-arm64.tar.gz", "tool", LINUX_X64), 10);
        let mac = Platform::new(Os::Darwin, Arch::Arm64);
        assert_eq!(score_asset("tool-osx-aarch64.zip", "tool", mac), 15);
        assert_eq!(score_asset("tool-mac.zip", "tool", mac), 10);
    }

    #[test]
    fn test_omnisharp_penalty() {
        assert_eq!(score_asset("omnisharp-linux-x64-net6.0.tar.gz", "omnisharp", LINUX_X64), 15);
        assert_eq!(score_asset("omnisharp-mono.tar.gz", "omnisharp", LINUX_X64), -15);
        assert_eq!(score_asset("omnisharp.http-linux-x64.tar.gz", "omnisharp", LINUX_X64), 0);
        // Only applies to omnisharp
        assert_eq!(score_asset("mono-linux-x64.tar.gz", "other", LINUX_X64), 15);
    }

    #[test]
    fn test_clangd_indexing_tools_penalty() {
        assert_eq!(score_asset("clangd-linux-18.1.3.zip", "clangd", LINUX_X64), 10);
        assert_eq!(
            score_asset("clangd_indexing_tools-linux-18.1.3.zip", "clangd", LINUX_X64),
            -20
        );
        assert_eq!(
            score_asset("clangd_indexing_tools-linux-18.1.3.zip", "other", LINUX_X64),
            10
        );

        let candidates = assets(&[
            "clangd_indexing_tools-linux-18.1.3.zip",
            "clangd-linux-18.1.3.zip",
            "clangd-mac-18.1.3.zip",
        ]);
        let chosen = select_asset(&candidates, "clangd", LINUX_X64).unwrap();
        assert_eq!(chosen.name, "clangd-linux-18.1.3.zip");
    }

    #[test]
    fn test_indexing_tools_needs_separator() {
        assert!(is_indexing_tools("clangd_indexing_tools"));
        assert!(is_indexing_tools("indexing.tools"));
        assert!(!is_indexing_tools("indexingtools"));
        assert!(!is_indexing_tools("indexing"));
    }

    #[test]
    fn test_ties_resolve_to_first() {
        let candidates = assets(&["a-linux.tar.gz", "b-linux.tar.gz"]);
        let chosen = select_asset(&candidates, "tool", LINUX_X64).unwrap();
        assert_eq!(chosen.name, "a-linux.tar.gz");
    }

    #[test]
    fn test_all_negative_still_selects() {
        let candidates = assets(&["tool-source.tar.gz", "tool-debug-symbols.zip"]);
        let chosen = select_asset(&candidates, "tool", LINUX_X64).unwrap();
        assert_eq!(chosen.name, "tool-source.tar.gz");
        assert_eq!(chosen.score, -20);
    }

    #[test]
    fn test_empty_is_format_error() {
        let err = select_asset(&[], "tool", LINUX_X64).unwrap_err();
        assert_eq!(err.kind(), toolshed_core::ErrorKind::Format);
    }

    proptest! {
        #[test]
        fn score_is_deterministic(name in "[a-zA-Z0-9._-]{0,40}", server in "(clangd|omnisharp|tool)") {
            prop_assert_eq!(
                score_asset(&name, &server, LINUX_X64),
                score_asset(&name, &server, LINUX_X64)
            );
        }

        #[test]
        fn selection_is_stable_and_maximal(names in prop::collection::vec("[a-z0-9_-]{1,12}(-linux|-darwin|-windows)?(-x64|-arm64)?(\\.zip|\\.tar\\.gz)", 1..8)) {
            let candidates = assets(&names.iter().map(String::as_str).collect::<Vec<_>>());
            let first = select_asset(&candidates, "tool", LINUX_X64).unwrap();
            let second = select_asset(&candidates, "tool", LINUX_X64).unwrap();
            prop_assert_eq!(&first, &second);

            let max = names.iter().map(|n| score_asset(n, "tool", LINUX_X64)).max().unwrap();
            prop_assert_eq!(first.score, max);
            let first_max = names.iter().position(|n| score_asset(n, "tool", LINUX_X64) == max).unwrap();
            prop_assert_eq!(&first.name, &names[first_max]);
        }
    }
}
