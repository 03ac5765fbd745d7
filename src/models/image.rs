//! Reference to an uploaded image in object storage

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// URL and storage key of an uploaded image. Both are always present together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageRef {
    pub url: String,
    pub key: String,
}

impl ImageRef {
    /// Rebuild from the two nullable columns; a half-filled pair reads as no image.
    pub fn from_columns(url: Option<String>, key: Option<String>) -> Option<Self> {
        match (url, key) {
            (Some(url), Some(key)) => Some(Self { url, key }),
            _ => None,
        }
    }
}

/// Split an optional image back into its `(url, key)` columns
pub fn image_columns(image: Option<&ImageRef>) -> (Option<&str>, Option<&str>) {
    match image {
        Some(image) => (Some(image.url.as_str()), Some(image.key.as_str())),
        None => (None, None),
    }
}
