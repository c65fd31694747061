//! Classifier client for the remote fire/no-fire model.
//!
//! The [`Classifier`] trait is the seam the orchestrator depends on.
//! [`HttpClassifier`] is the production implementation: one synchronous JSON
//! request per camera, no retries.

pub mod messages;

use crate::config::ClientConfig;
use crate::error::ClassificationError;
use async_trait::async_trait;
use messages::{ClassificationResult, InvocationRequest, LabelScore};
use tracing::{debug, error};

/// Something that can classify a camera feed.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the frame behind `feed_reference`.
    async fn classify(&self, feed_reference: &str)
        -> Result<ClassificationResult, ClassificationError>;
}

/// Classifier backed by an HTTP inference endpoint.
#[derive(Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpClassifier {
    /// Create a client for endpoint `endpoint_id` on the configured host.
    pub fn new(config: &ClientConfig, endpoint_id: &str) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder()
            .timeout(config.classify_timeout)
            .build()?;
        let url = format!(
            "{}/endpoints/{}/invocations",
            config.inference_host,
            urlencoding::encode(endpoint_id)
        );
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        feed_reference: &str,
    ) -> Result<ClassificationResult, ClassificationError> {
        debug!("Invoking {} for {}", self.url, feed_reference);
        let mut request = self.client.post(&self.url).json(&InvocationRequest {
            inputs: feed_reference,
        });
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Inference response for {}: {}", feed_reference, body);

        if !status.is_success() {
            error!("Inference request failed: {}", body);
            return Err(ClassificationError::Server {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let scores: Vec<LabelScore> = serde_json::from_str(&body)?;
        Ok(ClassificationResult::from_scores(scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::net::TcpListener;
    use std::time::Duration;

    fn classifier_for(server: &Server) -> HttpClassifier {
        let config = ClientConfig::default()
            .with_inference_host(server.url())
            .with_api_key("test_key");
        HttpClassifier::new(&config, "fire-classifier").unwrap()
    }

    #[test]
    fn test_classifier_url() {
        let config = ClientConfig::default().with_inference_host("http://infer.local/");
        let classifier = HttpClassifier::new(&config, "fire classifier").unwrap();
        assert_eq!(
            classifier.url(),
            "http://infer.local/endpoints/fire%20classifier/invocations"
        );
    }

    #[test]
    fn test_successful_classification() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/endpoints/fire-classifier/invocations")
            .match_header("content-type", "application/json")
            .match_header("x-api-key", "test_key")
            .match_body(Matcher::Json(json!({"inputs": "http://x/img.jpg"})))
            .with_status(200)
            .with_body(r#"[{"label":"fire","score":0.9},{"label":"nofire","score":0.1}]"#)
            .expect(1)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let result = classifier_for(&server)
                .classify("http://x/img.jpg")
                .await
                .unwrap();
            assert_eq!(result.fire_score(), 0.9);
            assert_eq!(result.no_fire_score(), 0.1);
        });

        mock.assert();
    }

    #[test]
    fn test_endpoint_error() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/endpoints/fire-classifier/invocations")
            .with_status(503)
            .with_body("model loading")
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            match classifier_for(&server).classify("http://x/img.jpg").await {
                Err(ClassificationError::Server {
                    status_code,
                    message,
                }) => {
                    assert_eq!(status_code, 503);
                    assert_eq!(message, "model loading");
                }
                other => panic!("Expected Server error, got {:?}", other),
            }
        });

        mock.assert();
    }

    #[test]
    fn test_malformed_response() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/endpoints/fire-classifier/invocations")
            .with_status(200)
            .with_body(r#"{"label":"fire","score":0.9}"#)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let result = classifier_for(&server).classify("http://x/img.jpg").await;
            assert!(
                matches!(result, Err(ClassificationError::MalformedResponse(_))),
                "Expected malformed response, got {:?}",
                result
            );
        });

        mock.assert();
    }

    #[test]
    fn test_out_of_range_score_is_malformed() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/endpoints/fire-classifier/invocations")
            .with_status(200)
            .with_body(r#"[{"label":"fire","score":1e30},{"label":"nofire","score":0.1}]"#)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            match classifier_for(&server).classify("http://x/img.jpg").await {
                Err(ClassificationError::MalformedResponse(e)) => {
                    assert!(e.to_string().contains("outside the storable range"))
                }
                other => panic!("Expected malformed response, got {:?}", other),
            }
        });

        mock.assert();
    }

    #[test]
    fn test_stalled_endpoint_times_out() {
        // Connections queue in the backlog and never get a reply.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ClientConfig::default()
            .with_inference_host(format!("http://{}", listener.local_addr().unwrap()))
            .with_classify_timeout(Duration::from_millis(200));
        let classifier = HttpClassifier::new(&config, "fire-classifier").unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(classifier.classify("http://x/img.jpg"));
        assert!(
            matches!(result, Err(ClassificationError::Timeout)),
            "Expected timeout, got {:?}",
            result
        );
        drop(listener);
    }
}
