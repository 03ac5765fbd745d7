//! Object storage for images
//!
//! `ObjectStorage` is the seam to the media store. `LocalObjectStorage` keeps
//! objects on disk and hands out URLs signed with a shared secret, served back
//! by the `/media` endpoint.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

/// Uploaded object location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

/// Raw upload received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under `key` (generated when absent) and return a readable URL
    async fn put(&self, bytes: Vec<u8>, content_type: &str, key: Option<String>) -> AppResult<StoredObject>;

    /// Read an object back
    async fn get(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Time-limited URL for an existing object
    async fn presign(&self, key: &str, ttl: Duration) -> AppResult<String>;

    /// Check a URL signature produced by `presign`
    fn verify(&self, key: &str, expires: i64, signature: &str) -> bool;

    /// Remove an object; `false` when the store refused
    async fn delete(&self, key: &str) -> bool;
}

type HmacSha256 = Hmac<Sha256>;

/// Build an object key `<prefix>/<uuid><.ext>`
pub fn object_key(prefix: &str, extension: Option<&str>) -> String {
    let ext = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();
    format!("{}/{}{}", prefix.trim_matches('/'), Uuid::new_v4(), ext)
}

/// File extension for the raster image types accepted as uploads. Anything
/// else, SVG included, is refused.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Content type served for a stored key
pub fn content_type_for(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn mac(secret: &str, key: &str, expires: i64) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid signing secret: {}", e)))?;
    mac.update(key.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    Ok(mac)
}

fn sign(secret: &str, key: &str, expires: i64) -> AppResult<String> {
    Ok(hex::encode(mac(secret, key, expires)?.finalize().into_bytes()))
}

fn signature_matches(secret: &str, key: &str, expires: i64, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac(secret, key, expires)
        .map(|mac| mac.verify_slice(&expected).is_ok())
        .unwrap_or(false)
}

/// Filesystem-backed object store
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
    signing_secret: String,
    default_ttl: Duration,
}

impl LocalObjectStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            signing_secret: config.signing_secret.clone(),
            default_ttl: Duration::from_secs(config.presign_ttl_secs),
        }
    }

    /// Map a key to a path under the root, refusing anything that could escape it
    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::BadRequest(format!("Invalid object key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.public_base_url,
            key,
            expires,
            sign(&self.signing_secret, key, expires)?
        ))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, key: Option<String>) -> AppResult<StoredObject> {
        let key = key.unwrap_or_else(|| object_key("items", image_extension(content_type)));
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Cannot create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot write {}: {}", key, e)))?;

        tracing::debug!(key = %key, content_type, size = bytes.len(), "Stored object");

        Ok(StoredObject {
            url: self.signed_url(&key, self.default_ttl)?,
            key,
        })
    }

    async fn get(&self, key: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Object {} not found", key)))
            }
            Err(e) => Err(AppError::Storage(format!("Cannot read {}: {}", key, e))),
        }
    }

    async fn presign(&self, key: &str, ttl: Duration) -> AppResult<String> {
        self.path_for(key)?;
        self.signed_url(key, ttl)
    }

    fn verify(&self, key: &str, expires: i64, signature: &str) -> bool {
        expires >= Utc::now().timestamp() && signature_matches(&self.signing_secret, key, expires, signature)
    }

    async fn delete(&self, key: &str) -> bool {
        let Ok(path) = self.path_for(key) else {
            return false;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to delete object");
                false
            }
        }
    }
}
