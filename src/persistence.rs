//! Persistence of detection outcomes.
//!
//! Every outcome becomes one record in the structured store. Fire outcomes
//! additionally archive the frame to object storage first; if archiving
//! fails the record is not written.

use crate::backends::{ObjectStore, RecordStore};
use crate::error::PersistenceError;
use crate::fetch::ImagePayload;
use crate::types::{DetectionOutcome, DetectionRecord, Label};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Prefix under which fire images are archived.
pub const ARCHIVE_PREFIX: &str = "camera_images";

/// A single wall clock reading, shared by the archive key and the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: elapsed.as_secs(),
            nanos: elapsed.subsec_nanos(),
        }
    }

    /// Fractional epoch seconds, e.g. `1700000000.000000042`.
    pub fn fractional(&self) -> String {
        format!("{}.{:09}", self.secs, self.nanos)
    }
}

/// Key an archived fire image is stored under.
pub fn archive_key(camera_id: &str, timestamp: &Timestamp) -> String {
    format!("{}/{}_{}.jpg", ARCHIVE_PREFIX, camera_id, timestamp.secs)
}

/// Id of the detection record written for one outcome.
pub fn record_id(camera_id: &str, timestamp: &Timestamp) -> String {
    format!("{}-{}", camera_id, timestamp.fractional())
}

/// Convert a score to the decimal it prints as, so 0.9 is stored as 0.9
/// rather than its binary approximation.
///
/// Digits past the 28th decimal place are rounded away, so scores below
/// 1e-28 are stored as zero. Magnitudes above the decimal range are an error.
pub fn exact_decimal(score: f64) -> Result<Decimal, PersistenceError> {
    if !score.is_finite() {
        return Err(PersistenceError::Score(score));
    }
    Decimal::from_str(&score.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(score))
        .map(|decimal| decimal.normalize())
        .ok_or(PersistenceError::Score(score))
}

/// Writes outcomes to the object and record stores.
#[derive(Clone)]
pub struct PersistenceSink {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    image_bucket: String,
    table_name: String,
}

impl PersistenceSink {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        image_bucket: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            records,
            image_bucket: image_bucket.into(),
            table_name: table_name.into(),
        }
    }

    /// Persist one outcome, archiving `image` when `label` is fire.
    pub async fn persist(
        &self,
        camera_id: &str,
        label: Label,
        fire_score: f64,
        no_fire_score: f64,
        image: &ImagePayload,
    ) -> Result<DetectionOutcome, PersistenceError> {
        let timestamp = Timestamp::now();
        let record = DetectionRecord {
            id: record_id(camera_id, &timestamp),
            cam_name: camera_id.to_string(),
            label,
            fire_score: exact_decimal(fire_score)?,
            no_fire_score: exact_decimal(no_fire_score)?,
            timestamp: timestamp.secs,
        };

        let archive_key = match label {
            Label::Fire => Some(self.archive(camera_id, &timestamp, image).await?),
            Label::NoFire => None,
        };

        self.records
            .put_item(&self.table_name, &record)
            .await
            .map_err(PersistenceError::Record)?;
        debug!("Metadata stored for camera ID: {}", camera_id);

        Ok(DetectionOutcome {
            camera_id: camera_id.to_string(),
            label,
            fire_score,
            no_fire_score,
            timestamp: timestamp.secs,
            archive_key,
        })
    }

    async fn archive(
        &self,
        camera_id: &str,
        timestamp: &Timestamp,
        image: &ImagePayload,
    ) -> Result<String, PersistenceError> {
        let key = archive_key(camera_id, timestamp);
        let content_type = mime_guess::from_path(&key).first_or_octet_stream();
        self.objects
            .put_object(
                &self.image_bucket,
                &key,
                image.as_bytes().to_vec(),
                content_type.essence_str(),
            )
            .await
            .map_err(PersistenceError::Archive)?;
        debug!("Image uploaded: {}", key);
        Ok(key)
    }
}
