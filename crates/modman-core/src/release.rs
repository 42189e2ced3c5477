use serde::{Deserialize, Serialize};

use crate::error::ModError;
use crate::package::PackageId;

/// The kind of downloadable asset a caller wants out of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Packaged package contents.
    Archive,
    /// Executable installer for the manager itself.
    Installer,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "zip archive",
            Self::Installer => "installer",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Archive => ".zip",
            Self::Installer => ".exe",
        }
    }

    pub fn matches(self, file_name: &str) -> bool {
        file_name
            .to_ascii_lowercase()
            .ends_with(self.extension())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Latest-release document as served by the release feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseDocument {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseDocument {
    pub fn from_json_slice(input: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(input)
    }

    /// First asset whose file name carries the kind's extension. No further ranking.
    pub fn select_asset(&self, kind: AssetKind) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| kind.matches(&asset.name))
    }
}

/// A resolved release: version tag plus the artifact to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub package_id: PackageId,
    pub version: String,
    pub artifact_name: String,
    pub artifact_url: String,
    pub artifact_size: Option<u64>,
}

impl Release {
    pub fn from_document(
        package_id: &PackageId,
        document: &ReleaseDocument,
        kind: AssetKind,
    ) -> Result<Self, ModError> {
        let asset = document
            .select_asset(kind)
            .ok_or_else(|| ModError::NoArtifact {
                package_id: package_id.to_string(),
                version: document.tag_name.clone(),
                expected: kind.as_str(),
            })?;

        Ok(Self {
            package_id: package_id.clone(),
            version: document.tag_name.clone(),
            artifact_name: asset.name.clone(),
            artifact_url: asset.download_url.clone(),
            artifact_size: asset.size,
        })
    }
}
