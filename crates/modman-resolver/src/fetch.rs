use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use modman_core::{FetchCause, ModError, Result};
use reqwest::blocking::{Client, Response};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("modman/", env!("CARGO_PKG_VERSION"));

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Downloads a byte blob. No caching, no resume, no retry.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|err| ModError::fetch("<http client>", transport(&err)))?;
        Ok(Self { client })
    }

    pub(crate) fn get(&self, url: &str, accept: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request
            .send()
            .map_err(|err| ModError::fetch(url, transport(&err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModError::fetch(url, FetchCause::Status(status.as_u16())));
        }
        Ok(response)
    }

    pub(crate) fn get_bytes(&self, url: &str, accept: Option<&str>) -> Result<Vec<u8>> {
        let response = self.get(url, accept)?;
        let body = response
            .bytes()
            .map_err(|err| ModError::fetch(url, FetchCause::Body(err.to_string())))?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }

    /// Streams a large payload into `destination`, reporting `(received, total)`.
    ///
    /// Data lands in a `.part` sibling first and is renamed into place only
    /// after the body was fully received.
    pub fn fetch_to_file(
        &self,
        url: &str,
        destination: &Path,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ModError::filesystem("create download dir", parent, err))?;
        }

        let part_path = destination.with_file_name(format!(
            "{}.part",
            destination
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("download")
        ));

        let result = self.stream_into(url, &part_path, on_progress);
        let received = match result {
            Ok(received) => received,
            Err(err) => {
                let _ = fs::remove_file(&part_path);
                return Err(err);
            }
        };

        if destination.exists() {
            fs::remove_file(destination)
                .map_err(|err| ModError::filesystem("replace download", destination, err))?;
        }
        fs::rename(&part_path, destination)
            .map_err(|err| ModError::filesystem("move download into place", destination, err))?;
        Ok(received)
    }

    fn stream_into(
        &self,
        url: &str,
        part_path: &Path,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64> {
        let mut response = self.get(url, None)?;
        let total = response.content_length();
        let mut file = fs::File::create(part_path)
            .map_err(|err| ModError::filesystem("create", part_path, err))?;

        let mut buffer = vec![0_u8; STREAM_CHUNK_SIZE];
        let mut received = 0_u64;
        on_progress(received, total);
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| ModError::fetch(url, FetchCause::Body(err.to_string())))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|err| ModError::filesystem("write", part_path, err))?;
            received += read as u64;
            on_progress(received, total);
        }
        file.flush()
            .map_err(|err| ModError::filesystem("flush", part_path, err))?;

        debug!(url, bytes = received, "streamed download complete");
        Ok(received)
    }
}

impl ArtifactFetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url, None)
    }
}

fn transport(err: &reqwest::Error) -> FetchCause {
    FetchCause::Transport(err.to_string())
}
