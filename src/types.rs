//! Common types shared by the pipeline stages.
//!
//! These describe the cameras going in and the outcomes coming out of one
//! batch run, plus the summary and response handed back to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A camera to process: a unique id and the URL of its latest frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraEntry {
    /// Camera identifier, unique within one roster
    pub id: String,
    /// URL of the camera's current frame
    pub feed_url: String,
    /// Human readable camera name, when the roster carries one
    pub name: Option<String>,
}

impl CameraEntry {
    pub fn new(id: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feed_url: feed_url.into(),
            name: None,
        }
    }
}

/// The closed label vocabulary of the fire classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "fire")]
    Fire,
    #[serde(rename = "nofire")]
    NoFire,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fire => "fire",
            Label::NoFire => "nofire",
        }
    }

    /// Parses a label as emitted by the inference service.
    ///
    /// Returns `None` for labels outside the vocabulary.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "fire" => Some(Label::Fire),
            "nofire" => Some(Label::NoFire),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The determination made for one camera in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub camera_id: String,
    pub label: Label,
    pub fire_score: f64,
    pub no_fire_score: f64,
    /// Integer epoch seconds at which the outcome was persisted
    pub timestamp: u64,
    /// Key of the archived image, present only for fire outcomes
    pub archive_key: Option<String>,
}

/// The row written to the structured store for every outcome.
///
/// Scores are exact decimals so the store keeps `0.9` as `0.9`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// `{camera_id}-{fractional epoch seconds}`
    pub id: String,
    pub cam_name: String,
    pub label: Label,
    pub fire_score: Decimal,
    pub no_fire_score: Decimal,
    pub timestamp: u64,
}

/// A camera that did not produce an outcome, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraFailure {
    pub camera_id: String,
    pub error: String,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Cameras that entered the pipeline
    pub attempted: usize,
    /// Outcomes labelled fire
    pub fire: usize,
    /// Outcomes labelled nofire
    pub nofire: usize,
    /// Roster entries dropped before processing
    pub skipped: usize,
    pub failures: Vec<CameraFailure>,
}

impl BatchSummary {
    pub fn record_outcome(&mut self, outcome: &DetectionOutcome) {
        match outcome.label {
            Label::Fire => self.fire += 1,
            Label::NoFire => self.nofire += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.fire + self.nofire
    }
}

/// Body of the batch entry point's response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Completed {
        message: String,
        #[serde(flatten)]
        summary: BatchSummary,
    },
    Failed {
        error: String,
    },
}

/// Response of the batch entry point, shaped like an HTTP reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl BatchResponse {
    pub fn completed(summary: BatchSummary) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Completed {
                message: "Processing completed".to_string(),
                summary,
            },
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            status_code: 500,
            body: ResponseBody::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_vocabulary() {
        assert_eq!(Label::parse("fire"), Some(Label::Fire));
        assert_eq!(Label::parse("nofire"), Some(Label::NoFire));
        assert_eq!(Label::parse("smoke"), None);
        assert_eq!(Label::parse("Fire"), None);
        assert_eq!(serde_json::to_value(Label::NoFire).unwrap(), json!("nofire"));
    }

    #[test]
    fn test_completed_response_shape() {
        let summary = BatchSummary {
            attempted: 2,
            fire: 1,
            nofire: 0,
            skipped: 1,
            failures: vec![CameraFailure {
                camera_id: "cam2".to_string(),
                error: "boom".to_string(),
            }],
        };
        let value = serde_json::to_value(BatchResponse::completed(summary)).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"]["message"], "Processing completed");
        assert_eq!(value["body"]["attempted"], 2);
        assert_eq!(value["body"]["failures"][0]["camera_id"], "cam2");
    }

    #[test]
    fn test_failed_response_shape() {
        let response = BatchResponse::failed("Roster document is not a list of cameras");
        assert!(!response.is_success());
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(
            value,
            json!({
                "statusCode": 500,
                "body": {"error": "Roster document is not a list of cameras"}
            })
        );
    }
}
