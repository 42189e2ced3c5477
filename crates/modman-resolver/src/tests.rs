use std::collections::HashMap;
use std::sync::Mutex;

use modman_core::{AssetKind, FetchCause, ModError, ModErrorKind, PackageId, ReleaseAsset, ReleaseDocument};

use super::*;
use crate::feed::map_missing_release;

struct StaticFeed {
    releases: HashMap<String, ReleaseDocument>,
}

impl ReleaseFeed for StaticFeed {
    fn latest_release(&self, package_id: &PackageId) -> modman_core::Result<ReleaseDocument> {
        self.releases
            .get(package_id.as_str())
            .cloned()
            .ok_or_else(|| ModError::NotFound {
                package_id: package_id.to_string(),
            })
    }
}

struct RecordingFetcher {
    body: Vec<u8>,
    requested: Mutex<Vec<String>>,
}

impl ArtifactFetcher for RecordingFetcher {
    fn fetch(&self, url: &str) -> modman_core::Result<Vec<u8>> {
        self.requested
            .lock()
            .expect("lock must not be poisoned")
            .push(url.to_string());
        Ok(self.body.clone())
    }
}

fn package(value: &str) -> PackageId {
    PackageId::parse(value).expect("package id must parse")
}

fn document(tag: &str, asset_names: &[&str]) -> ReleaseDocument {
    ReleaseDocument {
        tag_name: tag.to_string(),
        assets: asset_names
            .iter()
            .map(|name| ReleaseAsset {
                name: name.to_string(),
                download_url: format!("https://example.test/download/{name}"),
                size: Some(128),
            })
            .collect(),
    }
}

#[test]
fn resolve_latest_returns_tag_and_archive_url() {
    let mut releases = HashMap::new();
    releases.insert(
        "demo-pack".to_string(),
        document("v2.0.0", &["checksums.txt", "demo-pack.zip"]),
    );
    let feed = StaticFeed { releases };

    let release =
        resolve_latest(&feed, &package("demo-pack"), AssetKind::Archive).expect("must resolve");

    assert_eq!(release.version, "v2.0.0");
    assert_eq!(
        release.artifact_url,
        "https://example.test/download/demo-pack.zip"
    );
    assert_eq!(release.artifact_size, Some(128));
}

#[test]
fn resolve_latest_surfaces_not_found_for_missing_release() {
    let feed = StaticFeed {
        releases: HashMap::new(),
    };

    let err = resolve_latest(&feed, &package("ghost"), AssetKind::Archive)
        .expect_err("missing release must fail");
    assert_eq!(err.kind(), ModErrorKind::NotFound);
}

#[test]
fn resolve_latest_requires_matching_asset_kind() {
    let mut releases = HashMap::new();
    releases.insert(
        "mk8d-mod-manager".to_string(),
        document("v1.3.0", &["manager.zip"]),
    );
    let feed = StaticFeed { releases };

    let err = resolve_latest(&feed, &package("mk8d-mod-manager"), AssetKind::Installer)
        .expect_err("no installer asset must fail");
    assert_eq!(err.kind(), ModErrorKind::NoArtifact);
}

#[test]
fn http_404_from_release_feed_maps_to_not_found() {
    let err = map_missing_release(
        &package("demo-pack"),
        ModError::fetch("https://example.test", FetchCause::Status(404)),
    );
    assert_eq!(err.kind(), ModErrorKind::NotFound);

    let err = map_missing_release(
        &package("demo-pack"),
        ModError::fetch("https://example.test", FetchCause::Status(500)),
    );
    assert_eq!(err.kind(), ModErrorKind::Fetch);
}

#[test]
fn latest_release_url_joins_owner_and_package() {
    let client = HttpClient::new(DEFAULT_USER_AGENT).expect("client must build");
    let feed = GithubReleaseFeed::new(client, "https://api.example.test/", "LoveGmod");

    assert_eq!(
        feed.latest_release_url(&package("demo-pack")),
        "https://api.example.test/repos/LoveGmod/demo-pack/releases/latest"
    );
}

#[test]
fn fetch_catalog_parses_fetched_document() {
    let fetcher = RecordingFetcher {
        body: br#"{"mods": [{"name": "Demo Pack", "repo": "demo-pack"}]}"#.to_vec(),
        requested: Mutex::new(Vec::new()),
    };

    let catalog =
        fetch_catalog(&fetcher, "https://example.test/mods.json").expect("catalog must load");

    assert_eq!(catalog.entries.len(), 1);
    assert_eq!(
        fetcher.requested.lock().expect("lock").as_slice(),
        ["https://example.test/mods.json".to_string()]
    );
}

#[test]
fn fetch_catalog_reports_malformed_body_as_fetch_error() {
    let fetcher = RecordingFetcher {
        body: b"<html>rate limited</html>".to_vec(),
        requested: Mutex::new(Vec::new()),
    };

    let err = fetch_catalog(&fetcher, "https://example.test/mods.json")
        .expect_err("malformed catalog must fail");
    assert_eq!(err.kind(), ModErrorKind::Fetch);
    assert!(
        err.to_string().contains("unreadable response body"),
        "unexpected error: {err}"
    );
}
