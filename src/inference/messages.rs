//! Message types for the inference endpoint.
//!
//! The endpoint is invoked with a JSON object naming the feed to classify and
//! answers with a JSON list of label/score pairs:
//!
//! ```json
//! [{"label": "nofire", "score": 0.8}, {"label": "fire", "score": 0.2}]
//! ```

use crate::types::Label;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Largest score magnitude a detection record can hold as a decimal.
pub const MAX_SCORE: f64 = 7.9e28;

/// Request body sent to the inference endpoint.
#[derive(Serialize, Debug)]
pub struct InvocationRequest<'a> {
    /// Feed reference (the camera's frame URL), never the raw bytes
    pub inputs: &'a str,
}

/// One entry of the endpoint's response, before vocabulary filtering.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    #[serde(deserialize_with = "storable_score")]
    pub score: f64,
}

fn storable_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let score = f64::deserialize(deserializer)?;
    if score.abs() <= MAX_SCORE {
        Ok(score)
    } else {
        Err(D::Error::custom(format!(
            "score {} is outside the storable range",
            score
        )))
    }
}

/// Classifier scores restricted to the `{fire, nofire}` vocabulary.
///
/// Scores are independent confidences and need not sum to one. A label the
/// endpoint did not report counts as a score of zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassificationResult {
    fire: Option<f64>,
    no_fire: Option<f64>,
}

impl ClassificationResult {
    pub fn new(fire: Option<f64>, no_fire: Option<f64>) -> Self {
        Self { fire, no_fire }
    }

    /// Build a result from raw endpoint entries.
    ///
    /// Unknown labels are ignored. When a label repeats, the last score wins.
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = LabelScore>,
    {
        let mut result = Self::default();
        for entry in scores {
            match Label::parse(&entry.label) {
                Some(Label::Fire) => result.fire = Some(entry.score),
                Some(Label::NoFire) => result.no_fire = Some(entry.score),
                None => {}
            }
        }
        result
    }

    pub fn score(&self, label: Label) -> f64 {
        match label {
            Label::Fire => self.fire_score(),
            Label::NoFire => self.no_fire_score(),
        }
    }

    pub fn fire_score(&self) -> f64 {
        self.fire.unwrap_or(0.0)
    }

    pub fn no_fire_score(&self) -> f64 {
        self.no_fire.unwrap_or(0.0)
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fire={:.2}% nofire={:.2}%",
            self.fire_score() * 100.0,
            self.no_fire_score() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ClassificationResult {
        let scores: Vec<LabelScore> = serde_json::from_str(body).unwrap();
        ClassificationResult::from_scores(scores)
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_string(&InvocationRequest {
            inputs: "http://x/img.jpg",
        })
        .unwrap();
        assert_eq!(body, r#"{"inputs":"http://x/img.jpg"}"#);
    }

    #[test]
    fn test_scores_by_label() {
        let result = parse(r#"[{"label":"nofire","score":0.8},{"label":"fire","score":0.2}]"#);
        assert_eq!(result.fire_score(), 0.2);
        assert_eq!(result.no_fire_score(), 0.8);
        assert_eq!(result.score(Label::NoFire), 0.8);
        assert_eq!(result.to_string(), "fire=20.00% nofire=80.00%");
    }

    #[test]
    fn test_missing_and_unknown_labels() {
        let result = parse(r#"[{"label":"smoke","score":0.99},{"label":"fire","score":0.3}]"#);
        assert_eq!(result.fire_score(), 0.3);
        assert_eq!(result.no_fire_score(), 0.0);

        let result = parse("[]");
        assert_eq!(result, ClassificationResult::default());
        assert_eq!(result.fire_score(), 0.0);
    }

    #[test]
    fn test_repeated_label_keeps_last() {
        let result = parse(r#"[{"label":"fire","score":0.1},{"label":"fire","score":0.7}]"#);
        assert_eq!(result.fire_score(), 0.7);
    }

    #[test]
    fn test_scores_beyond_storable_range_are_rejected() {
        let err = serde_json::from_str::<Vec<LabelScore>>(r#"[{"label":"fire","score":1e30}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("outside the storable range"));

        let err = serde_json::from_str::<Vec<LabelScore>>(r#"[{"label":"nofire","score":-8e28}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("outside the storable range"));

        let result = parse(r#"[{"label":"fire","score":7.9e28},{"label":"nofire","score":1e-30}]"#);
        assert_eq!(result.fire_score(), MAX_SCORE);
        assert_eq!(result.no_fire_score(), 1e-30);
    }
}
