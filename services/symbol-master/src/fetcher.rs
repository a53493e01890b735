//! Raw master file download

use crate::error::FetchError;
use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::info;

/// Downloads raw bytes from a URL; no caching, every call hits the network
pub trait MasterFetcher: Send + Sync {
    /// Fetch the payload at `url`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failures and non-2xx responses.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl MasterFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(request_error)?;
        info!(
            "Downloaded {} bytes from {} in {:?}",
            bytes.len(),
            url,
            start.elapsed()
        );
        Ok(bytes.to_vec())
    }
}
