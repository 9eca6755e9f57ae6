#![doc = "Google Cloud Storage client: bridges the core `ObjectStore` contract to the GCS JSON upload API."]
//
//! # Object store integration (CLI <-> Core)
//!
//! This module wires the [`ObjectStore`] and [`StoreConnector`] traits from
//! `docs-publish-core::contract` to Google Cloud Storage.
//!
//! - [`GcsConnector`] is handed to the core pipeline; it builds a [`GcsClient`] from the
//!   service-account key file the pipeline writes for the duration of a publish.
//! - [`GcsClient`] authenticates with `yup-oauth2` and sends one `multipart/related` request per
//!   object, carrying the metadata (cache control, content encoding, content type) and the bytes.
//!
//! Every transport, auth, and HTTP status failure is mapped to an [`UploadError`] so the
//! publisher can count it and continue.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use docs_publish_core::contract::{
    ObjectStore, ObjectUpload, StoreConnector, StoredObject, UploadError,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;
use yup_oauth2::{AccessToken, ServiceAccountAuthenticator, ServiceAccountKey};

pub const UPLOAD_ENDPOINT: &str = "https://storage.googleapis.com/upload/storage/v1/b";
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Object resource fields read back from a successful upload.
#[derive(Debug, Deserialize)]
struct GcsObject {
    bucket: String,
    name: String,
    #[serde(default)]
    generation: Option<String>,
    #[serde(default)]
    size: Option<String>,
}

pub struct GcsClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    token: Mutex<Option<AccessToken>>,
    endpoint: String,
}

impl GcsClient {
    /// Build a client from a service-account key file. Each request times out after `timeout`.
    pub async fn from_credentials_file(
        path: &Path,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let key = yup_oauth2::read_service_account_key(path)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, path = %path.display(), "Failed to read service account key");
                UploadError::Auth(format!("failed to read service account key: {e}"))
            })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        tracing::info!(
            client_email = %key.client_email,
            timeout_secs = timeout.as_secs(),
            "Initialized GcsClient from credentials file"
        );
        Ok(GcsClient {
            http,
            key,
            token: Mutex::new(None),
            endpoint: UPLOAD_ENDPOINT.to_string(),
        })
    }

    /// Cached access token, refreshed once expired.
    async fn access_token(&self) -> Result<String, UploadError> {
        let mut cached = self.token.lock().await;
        if let Some(value) = cached
            .as_ref()
            .filter(|t| !t.is_expired())
            .and_then(|t| t.token())
        {
            return Ok(value.to_string());
        }

        let auth = ServiceAccountAuthenticator::builder(self.key.clone())
            .build()
            .await
            .map_err(|e| UploadError::Auth(e.to_string()))?;
        let token = auth.token(&[STORAGE_SCOPE]).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to obtain access token");
            UploadError::Auth(e.to_string())
        })?;
        let value = token
            .token()
            .map(str::to_string)
            .ok_or_else(|| UploadError::Auth("token response carried no access token".into()))?;
        tracing::debug!(expires = ?token.expiration_time(), "Obtained storage access token");
        *cached = Some(token);
        Ok(value)
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn upload(&self, req: ObjectUpload) -> Result<StoredObject, UploadError> {
        let raw = tokio::fs::read(&req.source_path)
            .await
            .map_err(|source| UploadError::Read {
                path: req.source_path.clone(),
                source,
            })?;
        let payload = if req.gzip {
            gzip(&raw).map_err(|e| UploadError::Encode(e.to_string()))?
        } else {
            raw
        };

        let content_type = content_type_for(&req.source_path);
        let metadata = object_metadata(&req, content_type);
        let boundary = format!("docs-publish-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &metadata, content_type, &payload);

        let token = self.access_token().await?;
        let url = format!("{}/{}/o?uploadType=multipart", self.endpoint, req.bucket);
        tracing::debug!(
            bucket = %req.bucket,
            name = %req.destination_key,
            bytes = payload.len(),
            "Sending object upload"
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, name = %req.destination_key, "Object store rejected upload");
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let object: GcsObject = response
            .json()
            .await
            .map_err(|e| UploadError::Transport(format!("unexpected upload response: {e}")))?;
        Ok(StoredObject {
            bucket: object.bucket,
            name: object.name,
            generation: object.generation,
            size: object.size.and_then(|s| s.parse().ok()),
        })
    }
}

/// Builds [`GcsClient`]s for the core pipeline.
#[derive(Debug, Clone)]
pub struct GcsConnector {
    timeout: Duration,
}

impl GcsConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl StoreConnector for GcsConnector {
    async fn connect(&self, credentials: &Path) -> Result<Box<dyn ObjectStore>, UploadError> {
        let client = GcsClient::from_credentials_file(credentials, self.timeout).await?;
        Ok(Box::new(client))
    }
}

fn object_metadata(req: &ObjectUpload, content_type: &str) -> serde_json::Value {
    let mut metadata = json!({
        "name": req.destination_key,
        "cacheControl": req.cache_control,
        "contentType": content_type,
    });
    if req.gzip {
        metadata["contentEncoding"] = json!("gzip");
    }
    metadata
}

fn multipart_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    payload: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn gzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

/// Content type from the file extension; generated documentation sites only use a few.
fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "tgz" | "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}
