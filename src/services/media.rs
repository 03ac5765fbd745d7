//! Image uploads and links over the object store

use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::ImageRef,
    storage::{content_type_for, image_extension, object_key, ObjectStorage, Upload},
};

/// Key prefix for item pictures
pub const ITEM_IMAGES: &str = "items";
/// Key prefix for patron profile pictures
pub const AVATARS: &str = "avatars";

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn ObjectStorage>,
    ttl: Duration,
    placeholder_avatar_url: String,
}

impl MediaService {
    pub fn new(storage: Arc<dyn ObjectStorage>, ttl: Duration, placeholder_avatar_url: String) -> Self {
        Self {
            storage,
            ttl,
            placeholder_avatar_url,
        }
    }

    /// Reject anything that is not a non-empty JPEG, PNG, GIF or WebP image of
    /// reasonable size. Returns the extension to store it under.
    pub fn check(&self, upload: &Upload) -> AppResult<&'static str> {
        if upload.bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
        }
        if upload.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest("Uploaded image is too large".to_string()));
        }
        image_extension(&upload.content_type).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Expected a JPEG, PNG, GIF or WebP image, got {}",
                upload.content_type
            ))
        })
    }

    /// Store an image under `prefix`
    pub async fn upload(&self, prefix: &str, upload: Upload) -> AppResult<ImageRef> {
        let extension = self.check(&upload)?;
        let key = object_key(prefix, Some(extension));
        let stored = self
            .storage
            .put(upload.bytes, &upload.content_type, Some(key))
            .await?;
        tracing::info!(
            key = %stored.key,
            file_name = upload.file_name.as_deref().unwrap_or(""),
            "Image uploaded"
        );
        Ok(ImageRef {
            url: stored.url,
            key: stored.key,
        })
    }

    /// Store an image when the upload is secondary to the operation: a storage
    /// failure becomes a warning instead of an error
    pub async fn upload_or_warn(
        &self,
        prefix: &str,
        upload: Upload,
        warnings: &mut Vec<String>,
    ) -> AppResult<Option<ImageRef>> {
        match self.upload(prefix, upload).await {
            Ok(image) => Ok(Some(image)),
            Err(AppError::Storage(message)) => {
                tracing::warn!(prefix, error = %message, "Image upload failed, saving without image");
                warnings.push(format!("Image could not be uploaded: {}", message));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal of a replaced or orphaned image
    pub async fn discard(&self, image: Option<ImageRef>) {
        if let Some(image) = image {
            if !self.storage.delete(&image.key).await {
                tracing::warn!(key = %image.key, "Stale image left in object storage");
            }
        }
    }

    /// Fresh link for a stored image; falls back to the stored URL when the
    /// store cannot sign
    pub async fn link(&self, image: &ImageRef) -> String {
        match self.storage.presign(&image.key, self.ttl).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(key = %image.key, error = %e, "Cannot presign image URL");
                image.url.clone()
            }
        }
    }

    pub async fn refresh(&self, image: &mut Option<ImageRef>) {
        if let Some(image) = image.as_mut() {
            image.url = self.link(image).await;
        }
    }

    pub async fn optional_link(&self, image: Option<&ImageRef>) -> Option<String> {
        match image {
            Some(image) => Some(self.link(image).await),
            None => None,
        }
    }

    /// Patron avatar link, the placeholder until one is uploaded
    pub async fn avatar_link(&self, image: Option<&ImageRef>) -> String {
        match image {
            Some(image) => self.link(image).await,
            None => self.placeholder_avatar_url.clone(),
        }
    }

    /// Serve the bytes behind a signed link
    pub async fn fetch(&self, key: &str, expires: i64, signature: &str) -> AppResult<(Vec<u8>, &'static str)> {
        if !self.storage.verify(key, expires, signature) {
            return Err(AppError::Authorization(
                "Invalid or expired media signature".to_string(),
            ));
        }
        let bytes = self.storage.get(key).await?;
        Ok((bytes, content_type_for(key)))
    }
}
