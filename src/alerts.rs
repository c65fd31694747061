//! Recent fire checks over stored detections.
//!
//! A camera is alerting when its newest record is labelled fire and was
//! written within the alert window. Older fire records and newer nofire
//! records both clear the alert.

use crate::backends::RecordStore;
use crate::error::StorageError;
use crate::persistence::Timestamp;
use crate::types::{DetectionRecord, Label};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How recent a fire record must be to raise an alert.
pub const DEFAULT_ALERT_WINDOW: Duration = Duration::from_secs(600);

/// A camera whose latest detection is a recent fire.
#[derive(Debug, Clone, PartialEq)]
pub struct FireAlert {
    pub camera_id: String,
    pub record: DetectionRecord,
}

impl fmt::Display for FireAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FIRE ALERT: Potential fire detected by camera {}. Please check the camera feed immediately.",
            self.camera_id
        )
    }
}

/// True if `record` is a fire detection newer than `window` at `now`
/// (epoch seconds).
pub fn is_recent_fire(record: &DetectionRecord, window: Duration, now: u64) -> bool {
    record.label == Label::Fire && record.timestamp.saturating_add(window.as_secs()) > now
}

/// The latest record of `camera_id` if it is a fire within `window` of now.
pub async fn recent_fire(
    records: &dyn RecordStore,
    table: &str,
    camera_id: &str,
    window: Duration,
) -> Result<Option<DetectionRecord>, StorageError> {
    recent_fire_at(records, table, camera_id, window, Timestamp::now().secs).await
}

/// [`recent_fire`] against an explicit clock reading.
pub async fn recent_fire_at(
    records: &dyn RecordStore,
    table: &str,
    camera_id: &str,
    window: Duration,
    now: u64,
) -> Result<Option<DetectionRecord>, StorageError> {
    let latest = records.latest_for_camera(table, camera_id).await?;
    debug!(
        "Latest record for {}: {:?}",
        camera_id,
        latest.as_ref().map(|record| &record.id)
    );
    Ok(latest.filter(|record| is_recent_fire(record, window, now)))
}

/// Check every camera in `camera_ids` and collect the alerting ones.
///
/// A camera whose lookup fails is logged and skipped; the rest are still
/// checked.
pub async fn check_cameras(
    records: &dyn RecordStore,
    table: &str,
    camera_ids: &[String],
    window: Duration,
    now: u64,
) -> Vec<FireAlert> {
    let mut alerts = Vec::new();
    for camera_id in camera_ids {
        match recent_fire_at(records, table, camera_id, window, now).await {
            Ok(Some(record)) => {
                info!(camera_id = %camera_id, record_id = %record.id, "Fire detected");
                alerts.push(FireAlert {
                    camera_id: camera_id.clone(),
                    record,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(camera_id = %camera_id, error = %e, "Fire alert check failed"),
        }
    }
    alerts
}
