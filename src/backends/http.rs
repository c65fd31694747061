//! HTTP storage gateway backends.
//!
//! Objects live at `{host}/{bucket}/{key}` and are read with `GET` and
//! written with `PUT`. Records are appended with a JSON `POST` to
//! `{host}/tables/{table}/items`, and the newest record of a camera is read
//! from `{host}/tables/{table}/items/latest?cam_name={camera}`. Every request carries the `x-api-key`
//! header when one is configured, and bodies are signed with HMAC-SHA256 into
//! `x-signature` when an HMAC key is set.

use super::{ObjectStore, RecordStore};
use crate::config::ClientConfig;
use crate::error::StorageError;
use crate::types::DetectionRecord;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use sha2::Sha256;
use tracing::{debug, error};

/// Request plumbing shared by both stores.
#[derive(Clone)]
struct Gateway {
    client: reqwest::Client,
    host: String,
    api_key: Option<String>,
    hmac_key: Option<String>,
}

impl Gateway {
    fn new(config: &ClientConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.storage_timeout)
            .build()?;
        Ok(Self {
            client,
            host: config.storage_host.clone(),
            api_key: config.api_key.clone(),
            hmac_key: config.hmac_key.clone(),
        })
    }

    fn create_signature(&self, data: &[u8]) -> Option<String> {
        let hmac_key = self.hmac_key.as_ref()?;
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key.as_bytes()).ok()?;
        mac.update(data);
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn headers(&self, body: &[u8], content_type: &str) -> Result<HeaderMap, StorageError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type.parse()?);
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", api_key.parse()?);
        }
        if let Some(signature) = self.create_signature(body) {
            debug!("Signed request body: {}", signature);
            headers.insert("x-signature", signature.parse()?);
        }
        Ok(headers)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", self.host, urlencoding::encode(bucket), key)
    }

    fn items_url(&self, table: &str) -> String {
        format!("{}/tables/{}/items", self.host, urlencoding::encode(table))
    }

    fn latest_item_url(&self, table: &str, cam_name: &str) -> String {
        format!(
            "{}/latest?cam_name={}",
            self.items_url(table),
            urlencoding::encode(cam_name)
        )
    }
}

/// Turns a non-success response into a `StorageError::Server`.
async fn check_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    debug!("Response status: {}", status);
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await?;
    error!("Request failed: {}", message);
    Err(StorageError::Server {
        status_code: status.as_u16(),
        message,
    })
}

/// Object store reached through the storage gateway.
#[derive(Clone)]
pub struct HttpObjectStore {
    gateway: Gateway,
}

impl HttpObjectStore {
    pub fn new(config: &ClientConfig) -> Result<Self, StorageError> {
        Ok(Self {
            gateway: Gateway::new(config)?,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.gateway.object_url(bucket, key);
        debug!("Fetching object: {}", url);

        let mut request = self.gateway.client.get(&url);
        if let Some(api_key) = &self.gateway.api_key {
            request = request.header("x-api-key", api_key);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.gateway.object_url(bucket, key);
        let headers = self.gateway.headers(&body, content_type)?;
        debug!("Uploading {} bytes to: {}", body.len(), url);

        let response = self
            .gateway
            .client
            .put(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Record store reached through the storage gateway.
#[derive(Clone)]
pub struct HttpRecordStore {
    gateway: Gateway,
}

impl HttpRecordStore {
    pub fn new(config: &ClientConfig) -> Result<Self, StorageError> {
        Ok(Self {
            gateway: Gateway::new(config)?,
        })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn put_item(&self, table: &str, record: &DetectionRecord) -> Result<(), StorageError> {
        let url = self.gateway.items_url(table);
        let body = serde_json::to_vec(record)?;
        let headers = self.gateway.headers(&body, "application/json")?;
        debug!("Writing record {} to: {}", record.id, url);

        let response = self
            .gateway
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn latest_for_camera(
        &self,
        table: &str,
        cam_name: &str,
    ) -> Result<Option<DetectionRecord>, StorageError> {
        let url = self.gateway.latest_item_url(table, cam_name);
        debug!("Fetching latest record: {}", url);

        let mut request = self.gateway.client.get(&url);
        if let Some(api_key) = &self.gateway.api_key {
            request = request.header("x-api-key", api_key);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;
    use mockito::{Matcher, Server};
    use rust_decimal::Decimal;
    use tracing_test::traced_test;

    fn config_for(server: &Server) -> ClientConfig {
        ClientConfig::default()
            .with_storage_host(server.url())
            .with_api_key("test_key")
    }

    fn test_record() -> DetectionRecord {
        DetectionRecord {
            id: "cam1-1700000000.000000001".to_string(),
            cam_name: "cam1".to_string(),
            label: Label::Fire,
            fire_score: Decimal::new(9, 1),
            no_fire_score: Decimal::new(1, 1),
            timestamp: 1700000000,
        }
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let gateway = Gateway::new(&ClientConfig::default().with_storage_host("http://h")).unwrap();
        assert_eq!(
            gateway.object_url("images", "camera_images/cam 1_5.jpg"),
            "http://h/images/camera_images/cam%201_5.jpg"
        );
        assert_eq!(gateway.items_url("fire-or-no-fire"), "http://h/tables/fire-or-no-fire/items");
        assert_eq!(
            gateway.latest_item_url("fire-or-no-fire", "Axis Alder"),
            "http://h/tables/fire-or-no-fire/items/latest?cam_name=Axis%20Alder"
        );
    }

    #[test]
    fn test_signature_only_with_hmac_key() {
        let gateway = Gateway::new(&ClientConfig::default()).unwrap();
        assert!(gateway.create_signature(b"data").is_none());

        let gateway = Gateway::new(&ClientConfig::default().with_hmac("secret")).unwrap();
        let signature = gateway.create_signature(b"data").unwrap();
        assert_eq!(signature.len(), 64);
        assert_eq!(gateway.create_signature(b"data").unwrap(), signature);
    }

    #[test]
    fn test_put_object_sends_body_and_headers() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/images/camera_images/cam1_1.jpg")
            .match_header("x-api-key", "test_key")
            .match_header("content-type", "image/jpeg")
            .match_header("x-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .match_body(vec![0xFF, 0xD8, 0xFF, 0xD9])
            .with_status(200)
            .expect(1)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = HttpObjectStore::new(&config_for(&server).with_hmac("secret")).unwrap();
            let result = store
                .put_object(
                    "images",
                    "camera_images/cam1_1.jpg",
                    vec![0xFF, 0xD8, 0xFF, 0xD9],
                    "image/jpeg",
                )
                .await;
            assert!(result.is_ok(), "Upload failed: {:?}", result.err());
        });

        mock.assert();
    }

    #[test]
    fn test_get_object_not_found() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/rosters/cams.json")
            .with_status(404)
            .with_body("NoSuchKey")
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = HttpObjectStore::new(&config_for(&server)).unwrap();
            match store.get_object("rosters", "cams.json").await {
                Err(StorageError::NotFound { bucket, key }) => {
                    assert_eq!(bucket, "rosters");
                    assert_eq!(key, "cams.json");
                }
                other => panic!("Expected NotFound, got {:?}", other),
            }
        });

        mock.assert();
    }

    #[test]
    #[traced_test]
    fn test_put_item_server_error() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/tables/events/items")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "cam_name": "cam1",
                "label": "fire",
                "fire_score": "0.9",
                "no_fire_score": "0.1",
                "timestamp": 1700000000u64
            })))
            .with_status(500)
            .with_body("table unavailable")
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = HttpRecordStore::new(&config_for(&server)).unwrap();
            match store.put_item("events", &test_record()).await {
                Err(StorageError::Server {
                    status_code,
                    message,
                }) => {
                    assert_eq!(status_code, 500);
                    assert_eq!(message, "table unavailable");
                }
                other => panic!("Expected Server error, got {:?}", other),
            }
        });

        mock.assert();
        assert!(logs_contain("Request failed: table unavailable"));
    }

    #[test]
    fn test_latest_for_camera() {
        let mut server = Server::new();
        let found = server
            .mock("GET", "/tables/events/items/latest")
            .match_query(Matcher::UrlEncoded("cam_name".into(), "cam1".into()))
            .match_header("x-api-key", "test_key")
            .with_status(200)
            .with_body(serde_json::to_string(&test_record()).unwrap())
            .create();
        let missing = server
            .mock("GET", "/tables/events/items/latest")
            .match_query(Matcher::UrlEncoded("cam_name".into(), "cam2".into()))
            .with_status(404)
            .create();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = HttpRecordStore::new(&config_for(&server)).unwrap();
            let latest = store.latest_for_camera("events", "cam1").await.unwrap();
            assert_eq!(latest, Some(test_record()));
            assert!(store.latest_for_camera("events", "cam2").await.unwrap().is_none());
        });

        found.assert();
        missing.assert();
    }
}
