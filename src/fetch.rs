//! Archive and binary downloads
//!
//! A single blocking GET per artifact. The body is buffered in memory and
//! its SHA-256 digest is recorded as provenance; it is never compared
//! against a publisher checksum.

use crate::error::FetchError;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// A downloaded payload and where it came from
#[derive(Debug, Clone)]
pub struct Archive {
    pub url: String,
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`
    pub digest: String,
}

impl Archive {
    pub fn new(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        let digest = sha256_hex(&bytes);
        Self {
            url: url.into(),
            bytes,
            digest,
        }
    }
}

/// Hex-encoded SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Something that can retrieve a URL into memory
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Archive, FetchError>;
}

/// Production fetcher backed by a blocking `ureq` agent
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher; `None` keeps the transport's default timeouts
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Archive, FetchError> {
        debug!("Downloading {}", url);

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status,
            });
        }

        let mut bytes = Vec::new();
        response
            .body_mut()
            .as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::BodyReadFailure {
                url: url.to_string(),
                source: e,
            })?;

        let archive = Archive::new(url, bytes);
        debug!(
            "Downloaded {} bytes from {} (sha256 {})",
            archive.bytes.len(),
            url,
            archive.digest
        );
        Ok(archive)
    }
}
