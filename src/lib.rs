pub mod alerts;
pub mod backends;
pub mod config;
pub mod decision;
mod error;
pub mod fetch;
pub mod inference;
mod orchestrator;
pub mod persistence;
pub mod roster;
pub mod types;

pub use alerts::{recent_fire, FireAlert};
pub use config::{BatchConfig, ClientConfig};
pub use decision::decide;
pub use error::{
    ClassificationError, FetchError, InvalidImageError, PersistenceError, PipelineError,
    RosterLoadError, StorageError,
};
pub use fetch::{is_valid_jpeg, ImageFetcher, ImagePayload};
pub use inference::messages::ClassificationResult;
pub use inference::{Classifier, HttpClassifier};
pub use orchestrator::Orchestrator;
pub use persistence::PersistenceSink;
pub use roster::Roster;
pub use types::{BatchResponse, BatchSummary, CameraEntry, DetectionOutcome, Label};
