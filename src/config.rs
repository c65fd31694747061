//! Batch and client configuration.
//!
//! [`BatchConfig`] names where the roster lives and where outcomes go.
//! [`ClientConfig`] carries what the network clients need to reach their
//! services. Both default to the production deployment values and are
//! adjusted with `with_*` builders.

use std::time::Duration;

pub const DEFAULT_ROSTER_BUCKET: &str = "filtered-cams-new";
pub const DEFAULT_ROSTER_KEY: &str = "filtered_cameras_100_with_demo.json";
pub const DEFAULT_IMAGE_BUCKET: &str = "fire-current-images-new";
pub const DEFAULT_TABLE_NAME: &str = "fire-or-no-fire";
pub const DEFAULT_ENDPOINT_ID: &str = "fire-classifier";
pub const DEFAULT_CONCURRENCY: usize = 8;

pub const DEFAULT_STORAGE_HOST: &str = "http://localhost:9000";
pub const DEFAULT_INFERENCE_HOST: &str = "http://localhost:8080";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a batch reads its roster and writes its outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Bucket holding the roster document
    pub roster_bucket: String,
    /// Key of the roster document within `roster_bucket`
    pub roster_key: String,
    /// Bucket fire images are archived to
    pub image_bucket: String,
    /// Table detection records are written to
    pub table_name: String,
    /// Identifier of the inference endpoint
    pub endpoint_id: String,
    /// Maximum number of cameras processed at once
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            roster_bucket: DEFAULT_ROSTER_BUCKET.to_string(),
            roster_key: DEFAULT_ROSTER_KEY.to_string(),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            endpoint_id: DEFAULT_ENDPOINT_ID.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BatchConfig {
    pub fn with_roster(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.roster_bucket = bucket.into();
        self.roster_key = key.into();
        self
    }

    pub fn with_image_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.image_bucket = bucket.into();
        self
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    pub fn with_endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = endpoint_id.into();
        self
    }

    /// Sets the worker count. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Connection settings shared by the HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the object and record store
    pub storage_host: String,
    /// Base URL of the inference service
    pub inference_host: String,
    /// Sent as `x-api-key` to the store and the inference service
    pub api_key: Option<String>,
    /// Key used to sign store request bodies
    pub hmac_key: Option<String>,
    pub fetch_timeout: Duration,
    pub classify_timeout: Duration,
    pub storage_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage_host: DEFAULT_STORAGE_HOST.to_string(),
            inference_host: DEFAULT_INFERENCE_HOST.to_string(),
            api_key: None,
            hmac_key: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            classify_timeout: DEFAULT_CLASSIFY_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn with_storage_host(mut self, host: impl Into<String>) -> Self {
        self.storage_host = trim_host(host.into());
        self
    }

    pub fn with_inference_host(mut self, host: impl Into<String>) -> Self {
        self.inference_host = trim_host(host.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_hmac(mut self, hmac_key: impl Into<String>) -> Self {
        self.hmac_key = Some(hmac_key.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_classify_timeout(mut self, timeout: Duration) -> Self {
        self.classify_timeout = timeout;
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }
}

fn trim_host(host: String) -> String {
    host.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.roster_bucket, "filtered-cams-new");
        assert_eq!(config.roster_key, "filtered_cameras_100_with_demo.json");
        assert_eq!(config.image_bucket, "fire-current-images-new");
        assert_eq!(config.table_name, "fire-or-no-fire");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = BatchConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::default()
            .with_storage_host("http://store.local/")
            .with_inference_host("http://infer.local")
            .with_api_key("key")
            .with_hmac("secret")
            .with_fetch_timeout(Duration::from_secs(2));
        assert_eq!(config.storage_host, "http://store.local");
        assert_eq!(config.inference_host, "http://infer.local");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.hmac_key.as_deref(), Some("secret"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.classify_timeout, DEFAULT_CLASSIFY_TIMEOUT);
    }
}
