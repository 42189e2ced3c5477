use modman_core::{AssetKind, PackageId, Release, Result};
use tracing::debug;

use crate::feed::ReleaseFeed;

/// Asks the feed for the package's latest release and picks its artifact.
pub fn resolve_latest(
    feed: &dyn ReleaseFeed,
    package_id: &PackageId,
    kind: AssetKind,
) -> Result<Release> {
    let document = feed.latest_release(package_id)?;
    let release = Release::from_document(package_id, &document, kind)?;
    debug!(
        package = %package_id,
        version = %release.version,
        artifact = %release.artifact_name,
        "resolved latest release"
    );
    Ok(release)
}
