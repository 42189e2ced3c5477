use modman_core::{Catalog, FetchCause, ModError, Result};
use tracing::debug;

use crate::fetch::ArtifactFetcher;

pub fn fetch_catalog(fetcher: &dyn ArtifactFetcher, url: &str) -> Result<Catalog> {
    let body = fetcher.fetch(url)?;
    let catalog = Catalog::from_json_slice(&body)
        .map_err(|err| ModError::fetch(url, FetchCause::Body(err.to_string())))?;
    debug!(url, packages = catalog.entries.len(), "loaded catalog");
    Ok(catalog)
}
