//! Frame retrieval and validation.
//!
//! A camera's feed URL is fetched with a single bounded GET. Only bytes that
//! look like a complete JPEG frame are allowed through to classification.

use crate::error::{FetchError, InvalidImageError, PipelineError};
use std::time::Duration;
use tracing::debug;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Returns true if `bytes` starts with the JPEG start-of-image marker and
/// ends with the end-of-image marker. Anything shorter than four bytes is
/// rejected, so the two markers never overlap.
pub fn is_valid_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes.starts_with(&JPEG_SOI) && bytes.ends_with(&JPEG_EOI)
}

/// Bytes of one frame that passed [`is_valid_jpeg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(Vec<u8>);

impl ImagePayload {
    pub fn new(bytes: Vec<u8>) -> Result<Self, InvalidImageError> {
        if is_valid_jpeg(&bytes) {
            Ok(Self(bytes))
        } else {
            Err(InvalidImageError { len: bytes.len() })
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Retrieves frames from camera feeds.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch and validate the current frame behind `feed_url`.
    pub async fn fetch(&self, feed_url: &str) -> Result<ImagePayload, PipelineError> {
        let bytes = self.fetch_bytes(feed_url).await?;
        debug!("Fetched {} bytes from {}", bytes.len(), feed_url);
        Ok(ImagePayload::new(bytes)?)
    }

    async fn fetch_bytes(&self, feed_url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: feed_url.to_string(),
                }
            } else {
                FetchError::Network {
                    url: feed_url.to_string(),
                    source,
                }
            }
        };

        let response = self.client.get(feed_url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: feed_url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(network)?;
        Ok(bytes.to_vec())
    }
}
