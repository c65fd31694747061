//! In-process backends.

use super::{ObjectStore, RecordStore};
use crate::error::StorageError;
use crate::types::DetectionRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// An object stored in a [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Object store backed by a map keyed on `(bucket, key)`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, e.g. a roster document.
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str) {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Sorted keys of every object in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        // A poisoned map is still consistent: every write is a single insert.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(bucket, key)
            .map(|object| object.body)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.insert(bucket, key, body, content_type);
        Ok(())
    }
}

/// Record store that appends to a vector per table.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<DetectionRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of `table` in insertion order.
    pub fn records(&self, table: &str) -> Vec<DetectionRecord> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put_item(&self, table: &str, record: &DetectionRecord) -> Result<(), StorageError> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn latest_for_camera(
        &self,
        table: &str,
        cam_name: &str,
    ) -> Result<Option<DetectionRecord>, StorageError> {
        // Ids embed the fractional timestamp, so they break ties within a second.
        Ok(self
            .records(table)
            .into_iter()
            .filter(|record| record.cam_name == cam_name)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))))
    }
}
