//! Batch orchestration.
//!
//! The [`Orchestrator`] owns every collaborator of the pipeline and drives
//! each camera through fetch, classify, decide and persist. Each camera is an
//! isolated unit of work: its error is logged and recorded in the
//! [`BatchSummary`] and never reaches its siblings. Cameras run on a bounded
//! pool of concurrent pipelines, so outcomes arrive in no particular order.

use crate::backends::{ObjectStore, RecordStore};
use crate::config::BatchConfig;
use crate::decision::decide;
use crate::error::PipelineError;
use crate::fetch::ImageFetcher;
use crate::inference::Classifier;
use crate::persistence::PersistenceSink;
use crate::roster::Roster;
use crate::types::{BatchResponse, BatchSummary, CameraEntry, CameraFailure, DetectionOutcome};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs detection batches over a camera roster.
pub struct Orchestrator {
    config: BatchConfig,
    objects: Arc<dyn ObjectStore>,
    fetcher: ImageFetcher,
    classifier: Arc<dyn Classifier>,
    sink: PersistenceSink,
}

impl Orchestrator {
    /// Assemble an orchestrator from explicitly constructed clients.
    ///
    /// `objects` serves both the roster document and the image archive.
    pub fn new(
        config: BatchConfig,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        fetcher: ImageFetcher,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let sink = PersistenceSink::new(
            objects.clone(),
            records,
            config.image_bucket.clone(),
            config.table_name.clone(),
        );
        Self {
            config,
            objects,
            fetcher,
            classifier,
            sink,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Load the configured roster and process it.
    ///
    /// Returns a 200 response once every camera has been attempted, whatever
    /// the individual outcomes, and a 500 response only when the roster
    /// cannot be loaded.
    pub async fn run_batch(&self) -> BatchResponse {
        let roster = match Roster::load(
            self.objects.as_ref(),
            &self.config.roster_bucket,
            &self.config.roster_key,
        )
        .await
        {
            Ok(roster) => roster,
            Err(e) => {
                error!(
                    bucket = %self.config.roster_bucket,
                    key = %self.config.roster_key,
                    error = %e,
                    "Failed to load camera roster"
                );
                return BatchResponse::failed(e);
            }
        };

        let mut summary = self.run(roster.cameras).await;
        summary.skipped = roster.skipped;
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded(),
            fire = summary.fire,
            nofire = summary.nofire,
            failed = summary.failures.len(),
            skipped = summary.skipped,
            "Processing completed"
        );
        BatchResponse::completed(summary)
    }

    /// Process every camera of `roster`, at most `concurrency` at a time.
    pub async fn run(&self, roster: Vec<CameraEntry>) -> BatchSummary {
        let mut summary = BatchSummary {
            attempted: roster.len(),
            ..BatchSummary::default()
        };
        debug!(
            "Processing {} cameras with {} workers",
            roster.len(),
            self.config.concurrency
        );

        let mut results = stream::iter(roster)
            .map(|camera| async move {
                let result = self.process_camera(&camera).await;
                (camera, result)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some((camera, result)) = results.next().await {
            match result {
                Ok(outcome) => {
                    info!(
                        camera_id = %outcome.camera_id,
                        label = %outcome.label,
                        fire_score = outcome.fire_score,
                        no_fire_score = outcome.no_fire_score,
                        "Detection stored"
                    );
                    summary.record_outcome(&outcome);
                }
                Err(e) => {
                    warn!(camera_id = %camera.id, error = %e, "Error processing camera");
                    summary.failures.push(CameraFailure {
                        camera_id: camera.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary
    }

    /// Run one camera through the pipeline.
    pub async fn process_camera(
        &self,
        camera: &CameraEntry,
    ) -> Result<DetectionOutcome, PipelineError> {
        let image = self.fetcher.fetch(&camera.feed_url).await?;
        let classification = self.classifier.classify(&camera.feed_url).await?;
        let label = decide(&classification);
        debug!("Camera {}: {} -> {}", camera.id, classification, label);

        let outcome = self
            .sink
            .persist(
                &camera.id,
                label,
                classification.fire_score(),
                classification.no_fire_score(),
                &image,
            )
            .await?;
        Ok(outcome)
    }
}
