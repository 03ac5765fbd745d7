//! Item (garment) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

use super::{
    category::Category,
    collection::CollectionShort,
    enums::{Condition, Size},
    image::ImageRef,
};

/// Internal row structure for item queries
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    id: Uuid,
    name: String,
    description: String,
    size: Size,
    condition: Condition,
    image_url: Option<String>,
    image_key: Option<String>,
    available: bool,
    private_collection: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            name: row.name,
            description: row.description,
            size: row.size,
            condition: row.condition,
            image: ImageRef::from_columns(row.image_url, row.image_key),
            available: row.available,
            private_collection: row.private_collection,
            created_by: row.created_by,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

/// Full item model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub size: Size,
    pub condition: Condition,
    pub image: Option<ImageRef>,
    pub available: bool,
    /// Cached: true iff any collection holding the item is private
    pub private_collection: bool,
    /// Librarian who cataloged the item
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Item as loaded for browsing: the item plus its category names and the ids
/// of the collections it currently belongs to
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    pub item: Item,
    pub category_names: Vec<String>,
    pub collection_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemSnapshotRow {
    #[sqlx(flatten)]
    item: ItemRow,
    category_names: Vec<String>,
    collection_ids: Vec<Uuid>,
}

impl From<ItemSnapshotRow> for ItemSnapshot {
    fn from(row: ItemSnapshotRow) -> Self {
        ItemSnapshot {
            item: row.item.into(),
            category_names: row.category_names,
            collection_ids: row.collection_ids,
        }
    }
}

/// Short item representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemShort {
    pub id: Uuid,
    pub name: String,
    pub size: Size,
    pub condition: Condition,
    pub image_url: Option<String>,
    pub available: bool,
    pub categories: Vec<String>,
}

impl ItemShort {
    pub fn new(item: &Item, categories: Vec<String>, image_url: Option<String>) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            size: item.size,
            condition: item.condition,
            image_url,
            available: item.available,
            categories,
        }
    }
}

/// Item page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemDetails {
    pub item: Item,
    pub categories: Vec<Category>,
    pub collections: Vec<CollectionShort>,
    pub average_rating: Option<f64>,
}

/// Item returned from a write that may have partially failed on media
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemWithWarnings {
    pub item: Item,
    pub warnings: Vec<String>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub size: Size,
    pub condition: Condition,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    /// Category created on the fly (or reused when the name exists) and attached
    #[validate(length(max = 100, message = "Category name must be at most 100 characters"))]
    pub new_category: Option<String>,
    #[serde(default)]
    pub collection_ids: Vec<Uuid>,
}

fn default_available() -> bool {
    true
}

/// Update item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub size: Option<Size>,
    pub condition: Option<Condition>,
    pub available: Option<bool>,
    /// Replaces the item's categories when present
    pub category_ids: Option<Vec<Uuid>>,
    #[validate(length(max = 100, message = "Category name must be at most 100 characters"))]
    pub new_category: Option<String>,
}

/// Browse query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BrowseQuery {
    /// Case-insensitive substring matched against item, category and collection names
    pub q: Option<String>,
}

/// Browse page: what the viewer may see, plus the private collections they
/// may ask to join
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrowseResult {
    pub query: Option<String>,
    pub items: Vec<ItemShort>,
    pub collections: Vec<CollectionShort>,
    pub restricted_collections: Vec<CollectionShort>,
    pub categories: Vec<Category>,
}

/// Derive the cached privacy flag from the privacy of every collection holding the item
pub fn derive_private_collection<I>(collection_privacy: I) -> bool
where
    I: IntoIterator<Item = bool>,
{
    collection_privacy.into_iter().any(|is_private| is_private)
}

/// Availability follows the lending lifecycle while a lending is pending or
/// approved; a manual edit is only accepted when nothing is out on loan.
pub fn check_availability_edit(current: bool, requested: Option<bool>, active_lendings: i64) -> AppResult<()> {
    match requested {
        Some(available) if available != current && active_lendings > 0 => Err(AppError::Conflict(
            "Item availability is managed by its active lending".to_string(),
        )),
        _ => Ok(()),
    }
}
