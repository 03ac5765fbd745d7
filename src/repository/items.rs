//! Items repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::{categories, collections};
use crate::{
    access::Viewer,
    error::{AppError, AppResult},
    models::{
        enums::LendingStatus,
        image::{image_columns, ImageRef},
        item::{check_availability_edit, derive_private_collection, CreateItem, Item, ItemRow, ItemSnapshot, ItemSnapshotRow, UpdateItem},
    },
};

const SNAPSHOT_SELECT: &str = r#"
    SELECT i.*,
           ARRAY(
               SELECT c.name FROM item_categories ic
               JOIN categories c ON c.id = ic.category_id
               WHERE ic.item_id = i.id
               ORDER BY LOWER(c.name)
           ) AS category_names,
           ARRAY(
               SELECT ci.collection_id FROM collection_items ci
               WHERE ci.item_id = i.id
           ) AS collection_ids
    FROM items i
"#;

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Item> {
        sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Item::from)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Every item with its categories and memberships, for browsing
    pub async fn list_snapshots(&self) -> AppResult<Vec<ItemSnapshot>> {
        let rows = sqlx::query_as::<_, ItemSnapshotRow>(&format!(
            "{} ORDER BY LOWER(i.name)",
            SNAPSHOT_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ItemSnapshot::from).collect())
    }

    /// Items held by a collection
    pub async fn list_in_collection(&self, collection_id: Uuid) -> AppResult<Vec<ItemSnapshot>> {
        let rows = sqlx::query_as::<_, ItemSnapshotRow>(&format!(
            r#"{}
            WHERE EXISTS (
                SELECT 1 FROM collection_items ci
                WHERE ci.item_id = i.id AND ci.collection_id = $1
            )
            ORDER BY LOWER(i.name)"#,
            SNAPSHOT_SELECT
        ))
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ItemSnapshot::from).collect())
    }

    /// Create an item with its categories and initial collections in one transaction
    pub async fn create(&self, data: &CreateItem, actor: &Viewer, created_by: Uuid) -> AppResult<Item> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item: Item = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO items (
                id, name, description, size, condition, available,
                private_collection, created_by, created_at, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(data.size)
        .bind(data.condition)
        .bind(data.available)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let category_ids =
            categories::resolve(&mut tx, &data.category_ids, data.new_category.as_deref()).await?;
        categories::set_item_categories(&mut tx, item.id, &category_ids).await?;

        if !data.collection_ids.is_empty() {
            collections::attach_item(&mut tx, item.id, &data.collection_ids, actor).await?;
        }

        let item = fetch_item(&mut tx, item.id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Update item fields and, when requested, its categories. The item row is
    /// locked so availability cannot be edited under an active lending.
    pub async fn update(&self, id: Uuid, data: &UpdateItem) -> AppResult<Item> {
        let mut tx = self.pool.begin().await?;

        let current: bool = sqlx::query_scalar("SELECT available FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        if data.available.is_some() {
            let active: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM lendings WHERE item_id = $1 AND status IN ($2, $3)",
            )
            .bind(id)
            .bind(LendingStatus::Pending)
            .bind(LendingStatus::Approved)
            .fetch_one(&mut *tx)
            .await?;
            check_availability_edit(current, data.available, active)?;
        }

        sqlx::query(
            r#"
            UPDATE items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                size = COALESCE($4, size),
                condition = COALESCE($5, condition),
                available = COALESCE($6, available),
                modified_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(data.size)
        .bind(data.condition)
        .bind(data.available)
        .execute(&mut *tx)
        .await?;

        if data.category_ids.is_some() || data.new_category.is_some() {
            let requested = match &data.category_ids {
                Some(ids) => ids.clone(),
                None => sqlx::query_scalar("SELECT category_id FROM item_categories WHERE item_id = $1")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?,
            };
            let category_ids =
                categories::resolve(&mut tx, &requested, data.new_category.as_deref()).await?;
            categories::set_item_categories(&mut tx, id, &category_ids).await?;
        }

        let item = fetch_item(&mut tx, id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Delete an item, returning it so its image can be cleaned up
    pub async fn delete(&self, id: Uuid) -> AppResult<Item> {
        sqlx::query_as::<_, ItemRow>("DELETE FROM items WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Item::from)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Replace the item image, returning the previous one
    pub async fn set_image(&self, id: Uuid, image: Option<&ImageRef>) -> AppResult<(Item, Option<ImageRef>)> {
        let mut tx = self.pool.begin().await?;

        let old: Item = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Item::from)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        let (url, key) = image_columns(image);
        let item: Item = sqlx::query_as::<_, ItemRow>(
            "UPDATE items SET image_url = $1, image_key = $2, modified_at = NOW() WHERE id = $3 RETURNING *",
        )
        .bind(url)
        .bind(key)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        tx.commit().await?;

        Ok((item, old.image))
    }
}

async fn fetch_item(conn: &mut PgConnection, id: Uuid) -> AppResult<Item> {
    let row = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.into())
}

/// Recompute and store the cached privacy flag of an item from its current
/// memberships. Runs inside the transaction that changed them.
pub(crate) async fn sync_private_flag(conn: &mut PgConnection, item_id: Uuid) -> AppResult<bool> {
    let privacy: Vec<bool> = sqlx::query_scalar(
        r#"
        SELECT c.is_private
        FROM collections c
        JOIN collection_items ci ON ci.collection_id = c.id
        WHERE ci.item_id = $1
        "#,
    )
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    let private_collection = derive_private_collection(privacy);

    sqlx::query("UPDATE items SET private_collection = $1 WHERE id = $2 AND private_collection <> $1")
        .bind(private_collection)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(item_id = %item_id, private_collection, "Synced item privacy flag");

    Ok(private_collection)
}
