//! File storage behind a narrow upload/destroy interface.
//!
//! `CloudinaryStorage` talks to a Cloudinary-compatible upload API with signed
//! requests. `MemoryFileStorage` keeps nothing but the identifiers and is used
//! when no provider credentials are configured.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::types::MediaKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File storage is not configured")]
    NotConfigured,

    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage provider rejected the request ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// A file received from a client, ready to hand to the provider
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub kind: MediaKind,
    /// Sub-folder below the configured root folder
    pub folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub public_id: String,
    pub url: String,
    pub size_bytes: i64,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(&self, upload: Upload) -> Result<StoredFile, StorageError>;

    /// Removing an identifier the provider no longer knows is not an error
    async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<(), StorageError>;
}

/// Pick the provider from configuration, falling back to memory
pub fn from_config(config: &StorageConfig) -> Arc<dyn FileStorage> {
    match CloudinaryStorage::new(config) {
        Ok(storage) => {
            info!(folder = %config.folder, "Using remote file storage");
            Arc::new(storage)
        }
        Err(e) => {
            warn!(reason = %e, "Remote file storage unavailable, uploads are kept in memory");
            Arc::new(MemoryFileStorage::new(&config.folder))
        }
    }
}

/// Join a sub-folder onto the root folder, dropping empty and traversal segments
fn target_folder(root: &str, sub: Option<&str>) -> String {
    let mut segments: Vec<&str> = root.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(sub) = sub {
        segments.extend(sub.split('/').map(str::trim).filter(|s| !s.is_empty() && *s != "." && *s != ".."));
    }
    segments.join("/")
}

pub struct CloudinaryStorage {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    bytes: i64,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

impl CloudinaryStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let (Some(cloud_name), Some(api_key), Some(api_secret)) =
            (&config.cloud_name, &config.api_key, &config.api_secret)
        else {
            return Err(StorageError::NotConfigured);
        };

        let base = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join(&format!("{}/", cloud_name)))
            .map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    fn action_url(&self, kind: MediaKind, action: &str) -> Result<Url, StorageError> {
        self.endpoint
            .join(&format!("{}/{}", kind.resource_type(), action))
            .map_err(|e| StorageError::InvalidEndpoint(e.to_string()))
    }

    /// SHA-256 over the alphabetically sorted parameters followed by the secret
    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        sign_params(params, &self.api_secret)
    }

    async fn provider_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let message = match response.json::<ProviderError>().await {
            Ok(body) => body.error.message,
            Err(_) => "unexpected response".to_string(),
        };
        StorageError::Provider { status, message }
    }
}

fn sign_params(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let payload = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl FileStorage for CloudinaryStorage {
    async fn upload(&self, upload: Upload) -> Result<StoredFile, StorageError> {
        let url = self.action_url(upload.kind, "upload")?;
        let folder = target_folder(&self.folder, upload.folder.as_deref());

        let mut params = BTreeMap::new();
        params.insert("folder", folder.clone());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = self.sign(&params);

        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        let body: UploadResponse = response.json().await?;
        info!(public_id = %body.public_id, bytes = body.bytes, "Uploaded file");

        Ok(StoredFile {
            public_id: body.public_id,
            url: body.secure_url,
            size_bytes: body.bytes,
        })
    }

    async fn destroy(&self, public_id: &str, kind: MediaKind) -> Result<(), StorageError> {
        let url = self.action_url(kind, "destroy")?;

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self.client.post(url).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Provider {
                status: 200,
                message: other.to_string(),
            }),
        }
    }
}

/// Keeps uploaded sizes by public id; the bytes themselves are discarded
#[derive(Default)]
pub struct MemoryFileStorage {
    folder: String,
    files: Mutex<HashMap<String, i64>>,
}

impl MemoryFileStorage {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.files.lock().contains_key(public_id)
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn upload(&self, upload: Upload) -> Result<StoredFile, StorageError> {
        let folder = target_folder(&self.folder, upload.folder.as_deref());
        let public_id = if folder.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}/{}", folder, Uuid::new_v4())
        };
        let size_bytes = upload.bytes.len() as i64;
        self.files.lock().insert(public_id.clone(), size_bytes);

        Ok(StoredFile {
            url: format!("memory://{}/{}", upload.kind.resource_type(), public_id),
            public_id,
            size_bytes,
        })
    }

    async fn destroy(&self, public_id: &str, _kind: MediaKind) -> Result<(), StorageError> {
        self.files.lock().remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_covers_sorted_params_and_secret() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());
        params.insert("folder", "nurture".to_string());

        let signature = sign_params(&params, "secret");
        assert_eq!(signature.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=nurture&timestamp=1700000000secret");
        assert_eq!(signature, format!("{:x}", hasher.finalize()));
        assert_ne!(signature, sign_params(&params, "other"));
    }

    #[test]
    fn folders_are_sanitized() {
        assert_eq!(target_folder("nurture", None), "nurture");
        assert_eq!(target_folder("nurture", Some("avatars")), "nurture/avatars");
        assert_eq!(target_folder("nurture/", Some("../../etc//x")), "nurture/etc/x");
    }

    #[test]
    fn unconfigured_provider_is_rejected() {
        assert!(matches!(
            CloudinaryStorage::new(&StorageConfig::default()),
            Err(StorageError::NotConfigured)
        ));
    }

    #[test]
    fn endpoint_includes_cloud_and_resource() {
        let config = StorageConfig {
            cloud_name: Some("demo".into()),
            api_key: Some("key".into()),
            api_secret: Some("secret".into()),
            ..StorageConfig::default()
        };
        let storage = CloudinaryStorage::new(&config).unwrap();
        let url = storage.action_url(MediaKind::Document, "upload").unwrap();
        assert_eq!(url.as_str(), "https://api.cloudinary.com/v1_1/demo/raw/upload");
    }

    #[tokio::test]
    async fn memory_storage_round_trip() {
        let storage = MemoryFileStorage::new("nurture");
        let stored = storage
            .upload(Upload {
                bytes: vec![0u8; 16],
                file_name: "scan.png".into(),
                content_type: "image/png".into(),
                kind: MediaKind::Image,
                folder: Some("scans".into()),
            })
            .await
            .unwrap();
        assert!(stored.public_id.starts_with("nurture/scans/"));
        assert_eq!(stored.size_bytes, 16);
        assert!(storage.contains(&stored.public_id));

        storage.destroy(&stored.public_id, MediaKind::Image).await.unwrap();
        assert!(!storage.contains(&stored.public_id));
    }
}
