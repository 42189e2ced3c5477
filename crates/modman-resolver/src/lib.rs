mod catalog;
mod feed;
mod fetch;
mod resolve;

pub use catalog::fetch_catalog;
pub use feed::{GithubReleaseFeed, ReleaseFeed, DEFAULT_RELEASE_API_BASE};
pub use fetch::{ArtifactFetcher, HttpClient, DEFAULT_USER_AGENT};
pub use resolve::resolve_latest;

#[cfg(test)]
mod tests;
