//! Camera roster parsing and loading.
//!
//! A roster is a JSON array of objects with an `id` and a `link` (the feed
//! URL), plus an optional `name`:
//!
//! ```json
//! [{"name": "Axis-Alder", "id": "Axis-Alder", "link": "https://.../latest-frame.jpg"}]
//! ```
//!
//! Entries without a usable id or link are dropped; they never fail the
//! whole roster.

use crate::backends::ObjectStore;
use crate::error::RosterLoadError;
use crate::types::CameraEntry;
use serde_json::Value;
use tracing::{debug, warn};

/// Cameras accepted from a roster document, and how many entries were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub cameras: Vec<CameraEntry>,
    pub skipped: usize,
}

impl Roster {
    /// Parse a roster document.
    pub fn parse(document: &[u8]) -> Result<Self, RosterLoadError> {
        let value: Value = serde_json::from_slice(document)?;
        let Value::Array(entries) = value else {
            return Err(RosterLoadError::NotAList);
        };

        let mut roster = Roster::default();
        for entry in &entries {
            match camera_from_value(entry) {
                Some(camera) => roster.cameras.push(camera),
                None => {
                    warn!("Skipping camera due to missing id or link: {}", entry);
                    roster.skipped += 1;
                }
            }
        }
        Ok(roster)
    }

    /// Load and parse the roster document at `bucket`/`key`.
    pub async fn load(
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<Self, RosterLoadError> {
        let document = store.get_object(bucket, key).await?;
        let roster = Self::parse(&document)?;
        debug!(
            "Loaded roster {}/{}: {} cameras, {} skipped",
            bucket,
            key,
            roster.cameras.len(),
            roster.skipped
        );
        Ok(roster)
    }
}

fn camera_from_value(entry: &Value) -> Option<CameraEntry> {
    let id = match entry.get("id")? {
        Value::String(id) => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let link = entry.get("link")?.as_str()?.trim();
    if id.is_empty() || link.is_empty() {
        return None;
    }
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Some(CameraEntry {
        id,
        feed_url: link.to_string(),
        name,
    })
}
