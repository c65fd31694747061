//! Error types for the fire detection pipeline.
//!
//! The errors mirror how far a camera got through the pipeline. Everything a
//! single camera can fail with is folded into [`PipelineError`], which the
//! orchestrator logs and records without stopping the batch. The only error
//! that aborts a batch is [`RosterLoadError`].

use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Failure to retrieve a frame from a camera feed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The feed answered with a non-success HTTP status.
    #[error("Failed to fetch image from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("Timed out fetching image from {url}")]
    Timeout { url: String },

    /// Connection, TLS or body transfer failure.
    #[error("Network error fetching image from {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The fetched bytes are not a complete JPEG frame.
#[derive(Error, Debug)]
#[error("Invalid image format ({len} bytes)")]
pub struct InvalidImageError {
    pub len: usize,
}

/// Failure to obtain a classification from the inference service.
#[derive(Error, Debug)]
pub enum ClassificationError {
    /// Connection or transfer failure while talking to the endpoint.
    #[error("Inference request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// The endpoint did not answer within the configured timeout.
    #[error("Inference request timed out")]
    Timeout,

    /// The endpoint answered with a non-2xx status.
    #[error("Inference endpoint error {status_code}: {message}")]
    Server { status_code: u16, message: String },

    /// The response body is not a list of `{label, score}` pairs.
    #[error("Malformed inference response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClassificationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassificationError::Timeout
        } else {
            ClassificationError::Network(err)
        }
    }
}

/// Failure to archive an image or write a detection record.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Archiving a fire image failed; no record was written.
    #[error("Failed to archive image: {0}")]
    Archive(#[source] StorageError),

    /// Writing the detection record failed.
    #[error("Failed to write detection record: {0}")]
    Record(#[source] StorageError),

    /// A score could not be represented as an exact decimal.
    #[error("Score {0} has no decimal representation")]
    Score(f64),
}

/// Everything that can stop a single camera from producing an outcome.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// The roster could not be loaded, so no camera is processed.
#[derive(Error, Debug)]
pub enum RosterLoadError {
    #[error("Failed to read roster: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to parse roster: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Roster document is not a list of cameras")]
    NotAList,
}

/// Transport-level failures of the object and record stores.
#[derive(Debug)]
pub enum StorageError {
    Server {
        status_code: u16,
        message: String,
    },
    NotFound {
        bucket: String,
        key: String,
    },
    Network(reqwest::Error),
    Json(serde_json::Error),
    Header(reqwest::header::InvalidHeaderValue),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Server {
                status_code,
                message,
            } => {
                write!(f, "Server error {}: {}", status_code, message)
            }
            StorageError::NotFound { bucket, key } => {
                write!(f, "Object not found: {}/{}", bucket, key)
            }
            StorageError::Network(e) => write!(f, "Network error: {}", e),
            StorageError::Json(e) => write!(f, "JSON error: {}", e),
            StorageError::Header(e) => write!(f, "Header error: {}", e),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::Network(e) => Some(e),
            StorageError::Json(e) => Some(e),
            StorageError::Header(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Network(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Json(err)
    }
}

impl From<reqwest::header::InvalidHeaderValue> for StorageError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        StorageError::Header(err)
    }
}
