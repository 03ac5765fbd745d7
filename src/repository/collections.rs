//! Collections repository: collections, allow-lists and item memberships

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::items::sync_private_flag;
use crate::{
    access::{self, Viewer},
    error::{AppError, AppResult},
    models::{
        collection::{check_membership_add, CreateCollection, MembershipRef, UpdateCollection},
        enums::RoleKind,
        Collection,
    },
};

const COLLECTION_SELECT: &str = r#"
    SELECT c.id, c.name, c.description, c.created_by, c.is_private,
           ARRAY(
               SELECT cp.patron_id FROM collection_patrons cp
               WHERE cp.collection_id = c.id
           ) AS allowed_patrons,
           c.created_at
    FROM collections c
"#;

#[derive(Clone)]
pub struct CollectionsRepository {
    pool: Pool<Postgres>,
}

impl CollectionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get collection by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Collection> {
        sqlx::query_as::<_, Collection>(&format!("{} WHERE c.id = $1", COLLECTION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection with id {} not found", id)))
    }

    /// All collections, sorted by name
    pub async fn list_all(&self) -> AppResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            "{} ORDER BY LOWER(c.name)",
            COLLECTION_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Collections holding an item
    pub async fn list_for_item(&self, item_id: Uuid) -> AppResult<Vec<Collection>> {
        let mut conn = self.pool.acquire().await?;
        collections_of_item(&mut conn, item_id).await
    }

    /// Create a collection. A private collection created by a patron starts
    /// with its creator on the allow-list.
    pub async fn create(&self, data: &CreateCollection, created_by: &Viewer) -> AppResult<Collection> {
        let creator_id = created_by.require_authenticated()?;
        let mut tx = self.pool.begin().await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO collections (id, name, description, created_by, is_private, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(creator_id)
        .bind(data.is_private)
        .execute(&mut *tx)
        .await?;

        let mut allowed = data.allowed_patrons.clone();
        if let Viewer::Patron(patron_id) = created_by {
            if data.is_private {
                allowed.push(*patron_id);
            }
        }
        replace_allow_list(&mut tx, id, &allowed).await?;

        let collection = fetch_collection(&mut tx, id, false).await?;
        tx.commit().await?;

        Ok(collection)
    }

    /// Edit a collection. Turning it private is refused while any of its items
    /// also belongs to another collection; on any privacy change the cached
    /// flag of every member item is refreshed.
    pub async fn update(&self, id: Uuid, data: &UpdateCollection, actor: &Viewer) -> AppResult<Collection> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_collection(&mut tx, id, true).await?;
        if !access::can_modify_collection(actor, &current) {
            return Err(AppError::Authorization(
                "You cannot modify this collection".to_string(),
            ));
        }

        let is_private = data.is_private.unwrap_or(current.is_private);
        if is_private && !current.is_private {
            lock_member_items(&mut tx, id).await?;
            let shared: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM collection_items ci
                WHERE ci.collection_id = $1
                  AND EXISTS (
                      SELECT 1 FROM collection_items other
                      WHERE other.item_id = ci.item_id AND other.collection_id <> $1
                  )
                "#,
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if shared > 0 {
                return Err(AppError::Validation(format!(
                    "{} item(s) of this collection belong to other collections; a private collection must be the only collection of its items",
                    shared
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE collections SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_private = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(is_private)
        .execute(&mut *tx)
        .await?;

        let mut allowed = match &data.allowed_patrons {
            Some(requested) => {
                sqlx::query("DELETE FROM collection_patrons WHERE collection_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                let mut allowed = requested.clone();
                if current.is_allowed(current.created_by) {
                    allowed.push(current.created_by);
                }
                allowed
            }
            None => Vec::new(),
        };
        if is_private && !current.is_private {
            allowed.push(current.created_by);
        }
        replace_allow_list(&mut tx, id, &allowed).await?;

        if is_private != current.is_private {
            let item_ids = member_item_ids(&mut tx, id).await?;
            for item_id in &item_ids {
                sync_private_flag(&mut tx, *item_id).await?;
            }
            tracing::info!(
                collection_id = %id,
                is_private,
                items = item_ids.len(),
                "Collection privacy changed"
            );
        }

        let collection = fetch_collection(&mut tx, id, false).await?;
        tx.commit().await?;

        Ok(collection)
    }

    /// Delete a collection and refresh the privacy flag of its former items
    pub async fn delete(&self, id: Uuid, actor: &Viewer) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_collection(&mut tx, id, true).await?;
        if !access::can_modify_collection(actor, &current) {
            return Err(AppError::Authorization(
                "You cannot delete this collection".to_string(),
            ));
        }

        let item_ids = member_item_ids(&mut tx, id).await?;

        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for item_id in &item_ids {
            sync_private_flag(&mut tx, *item_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Add an item to collections; see [`attach_item`]
    pub async fn add_item(&self, item_id: Uuid, collection_ids: &[Uuid], actor: &Viewer) -> AppResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;
        let added = attach_item(&mut tx, item_id, collection_ids, actor).await?;
        tx.commit().await?;
        Ok(added)
    }

    /// Remove an item from a collection
    pub async fn remove_item(&self, collection_id: Uuid, item_id: Uuid, actor: &Viewer) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let collection = fetch_collection(&mut tx, collection_id, true).await?;
        if !access::can_modify_collection(actor, &collection) {
            return Err(AppError::Authorization(
                "You cannot modify this collection".to_string(),
            ));
        }

        lock_item(&mut tx, item_id).await?;

        let result = sqlx::query("DELETE FROM collection_items WHERE collection_id = $1 AND item_id = $2")
            .bind(collection_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Item {} is not in collection {}",
                item_id, collection_id
            )));
        }

        sync_private_flag(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Take a patron off the allow-list. The creator always keeps access.
    pub async fn remove_patron(&self, collection_id: Uuid, patron_id: Uuid, actor: &Viewer) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let collection = fetch_collection(&mut tx, collection_id, true).await?;
        if !access::can_modify_collection(actor, &collection) {
            return Err(AppError::Authorization(
                "You cannot modify this collection".to_string(),
            ));
        }
        if collection.created_by == patron_id {
            return Err(AppError::Validation(
                "The creator of a collection cannot be removed from it".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM collection_patrons WHERE collection_id = $1 AND patron_id = $2")
            .bind(collection_id)
            .bind(patron_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Patron {} has no access to collection {}",
                patron_id, collection_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Load a collection with its allow-list, optionally locking its row
pub(crate) async fn fetch_collection(conn: &mut PgConnection, id: Uuid, for_update: bool) -> AppResult<Collection> {
    let lock = if for_update { " FOR UPDATE OF c" } else { "" };
    sqlx::query_as::<_, Collection>(&format!("{} WHERE c.id = $1{}", COLLECTION_SELECT, lock))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Collection with id {} not found", id)))
}

async fn collections_of_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<Vec<Collection>> {
    let rows = sqlx::query_as::<_, Collection>(&format!(
        r#"{}
        WHERE EXISTS (
            SELECT 1 FROM collection_items ci
            WHERE ci.collection_id = c.id AND ci.item_id = $1
        )
        ORDER BY LOWER(c.name)"#,
        COLLECTION_SELECT
    ))
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn member_item_ids(conn: &mut PgConnection, collection_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = sqlx::query_scalar("SELECT item_id FROM collection_items WHERE collection_id = $1")
        .bind(collection_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Lock every item of a collection. Taken after the collection row, the same
/// order `attach_item` uses, so membership changes of those items wait.
async fn lock_member_items(conn: &mut PgConnection, collection_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        SELECT i.id FROM items i
        JOIN collection_items ci ON ci.item_id = i.id
        WHERE ci.collection_id = $1
        ORDER BY i.id
        FOR UPDATE OF i
        "#,
    )
    .bind(collection_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(())
}

/// Order in which target collections are locked: sorted and without repeats,
/// so concurrent multi-target adds cannot deadlock each other
pub(crate) fn lock_order(collection_ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = collection_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn lock_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<()> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM items WHERE id = $1 FOR UPDATE")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
}

/// Insert allow-list entries, keeping only users that currently are patrons
async fn replace_allow_list(conn: &mut PgConnection, collection_id: Uuid, patron_ids: &[Uuid]) -> AppResult<()> {
    if patron_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO collection_patrons (collection_id, patron_id)
        SELECT $1, u.id FROM users u
        WHERE u.id = ANY($2) AND u.role = $3
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(collection_id)
    .bind(patron_ids)
    .bind(RoleKind::Patron)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Put a patron on the allow-list of a collection
pub(crate) async fn grant_access(conn: &mut PgConnection, collection_id: Uuid, patron_id: Uuid) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO collection_patrons (collection_id, patron_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(collection_id)
    .bind(patron_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Add an item to collections inside the caller's transaction.
///
/// Every target must exist and be modifiable by `actor`, who must also be able
/// to see the item. Target collections are locked before the item, like every
/// other membership change, so a collection turning private and an item joining
/// another collection cannot interleave. Privacy exclusivity is enforced
/// against the item's memberships read under those locks, and the item's
/// privacy flag is refreshed afterwards. Returns the collections the item
/// newly joined.
pub(crate) async fn attach_item(
    conn: &mut PgConnection,
    item_id: Uuid,
    collection_ids: &[Uuid],
    actor: &Viewer,
) -> AppResult<Vec<Uuid>> {
    let mut locked = Vec::with_capacity(collection_ids.len());
    for id in lock_order(collection_ids) {
        let collection = fetch_collection(conn, id, true).await?;
        if !access::can_modify_collection(actor, &collection) {
            return Err(AppError::Authorization(format!(
                "You cannot add items to collection {}",
                collection.name
            )));
        }
        locked.push(collection);
    }

    lock_item(conn, item_id).await?;

    let current = collections_of_item(conn, item_id).await?;
    if !access::can_view_item(actor, &current) {
        return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
    }

    let targets: Vec<MembershipRef> = collection_ids
        .iter()
        .filter_map(|id| locked.iter().find(|c| c.id == *id))
        .map(Collection::membership)
        .collect();

    let memberships: Vec<MembershipRef> = current.iter().map(Collection::membership).collect();
    let added = check_membership_add(&memberships, &targets)?;
    if added.is_empty() {
        return Ok(added);
    }

    sqlx::query(
        r#"
        INSERT INTO collection_items (collection_id, item_id)
        SELECT UNNEST($1::uuid[]), $2
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&added)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;

    let private_collection = sync_private_flag(conn, item_id).await?;
    tracing::info!(
        item_id = %item_id,
        added = added.len(),
        private_collection,
        "Item added to collections"
    );

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_is_sorted_and_unique() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);

        assert_eq!(lock_order(&[c, a, b, a]), vec![a, b, c]);
        assert_eq!(lock_order(&[b, a]), lock_order(&[a, b]));
        assert!(lock_order(&[]).is_empty());
    }
}
