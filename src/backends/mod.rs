//! Storage backend abstraction
//!
//! This module provides trait-based abstractions over the two stores the
//! pipeline writes to:
//!
//! - **Object store**: durable blobs. Holds the roster document and archived
//!   fire images.
//! - **Record store**: append-only structured records, one per outcome,
//!   queried back by camera for fire alerts.
//!
//! Two implementations ship with the crate. The HTTP backends talk to a
//! storage gateway; the memory backends keep everything in process and are
//! used for local runs and tests.

use crate::error::StorageError;
use crate::types::DetectionRecord;
use async_trait::async_trait;

pub mod http;
pub mod memory;

pub use http::{HttpObjectStore, HttpRecordStore};
pub use memory::{MemoryObjectStore, MemoryRecordStore};

/// Blob storage addressed by bucket and key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a whole object, replacing any existing one under the same key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Append-only table of detection records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one record to `table`.
    async fn put_item(&self, table: &str, record: &DetectionRecord) -> Result<(), StorageError>;

    /// The newest record of `table` whose `cam_name` is `cam_name`, by
    /// timestamp. `None` when the camera has no records.
    async fn latest_for_camera(
        &self,
        table: &str,
        cam_name: &str,
    ) -> Result<Option<DetectionRecord>, StorageError>;
}
