use modman_core::{FetchCause, ModError, PackageId, ReleaseDocument, Result};

use crate::fetch::HttpClient;

pub const DEFAULT_RELEASE_API_BASE: &str = "https://api.github.com";

const RELEASE_ACCEPT: &str = "application/vnd.github+json";

/// Source of "latest release" documents, one per package.
pub trait ReleaseFeed: Send + Sync {
    /// Fails with `NotFound` when the package has no published release.
    fn latest_release(&self, package_id: &PackageId) -> Result<ReleaseDocument>;
}

/// Release feed backed by a GitHub-compatible releases API, with every
/// package living as a repository under one owner.
#[derive(Debug, Clone)]
pub struct GithubReleaseFeed {
    client: HttpClient,
    api_base: String,
    owner: String,
}

impl GithubReleaseFeed {
    pub fn new(client: HttpClient, api_base: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            owner: owner.into(),
        }
    }

    pub fn latest_release_url(&self, package_id: &PackageId) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.owner,
            package_id
        )
    }
}

impl ReleaseFeed for GithubReleaseFeed {
    fn latest_release(&self, package_id: &PackageId) -> Result<ReleaseDocument> {
        let url = self.latest_release_url(package_id);
        let body = self
            .client
            .get_bytes(&url, Some(RELEASE_ACCEPT))
            .map_err(|err| map_missing_release(package_id, err))?;

        ReleaseDocument::from_json_slice(&body)
            .map_err(|err| ModError::fetch(url, FetchCause::Body(err.to_string())))
    }
}

/// The releases API answers 404 both for unknown repositories and for
/// repositories without any published release.
pub(crate) fn map_missing_release(package_id: &PackageId, err: ModError) -> ModError {
    match err {
        ModError::Fetch {
            cause: FetchCause::Status(404),
            ..
        } => ModError::NotFound {
            package_id: package_id.to_string(),
        },
        other => other,
    }
}
