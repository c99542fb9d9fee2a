//! Reading data and metadata sources.
//!
//! A location is either an `http(s)://` URL or a path relative to the
//! collections directory. The [`Fetcher`] trait is the seam the loader goes
//! through, so tests can script responses without touching disk or network.

use crate::collection::is_remote;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// Source of raw text for a location. Must be `Sync` for parallel fetching.
pub trait Fetcher: Sync {
    fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

/// Fetches URLs over HTTP and everything else from the local filesystem.
pub struct SourceFetcher {
    root: PathBuf,
    client: reqwest::blocking::Client,
}

impl SourceFetcher {
    /// `root` is the directory relative locations resolve against.
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("forum-ssg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            root: root.into(),
            client,
        })
    }

    fn fetch_remote(&self, url: &str) -> Result<String, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(request_error)
    }

    fn fetch_local(&self, location: &str) -> Result<String, FetchError> {
        let path = self.root.join(location);
        fs::read_to_string(&path).map_err(|source| FetchError::Io { path, source })
    }
}

impl Fetcher for SourceFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        if is_remote(location) {
            self.fetch_remote(location)
        } else {
            self.fetch_local(location)
        }
    }
}
