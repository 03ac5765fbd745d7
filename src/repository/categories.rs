//! Categories repository

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::category::{normalize_category_name, Category},
};

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All categories, sorted by name
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY LOWER(name)")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Categories attached to an item
    pub async fn for_item(&self, item_id: Uuid) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name
            FROM categories c
            JOIN item_categories ic ON ic.category_id = c.id
            WHERE ic.item_id = $1
            ORDER BY LOWER(c.name)
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Fetch the category with this name, creating it when absent
pub(crate) async fn get_or_create(conn: &mut PgConnection, name: &str) -> AppResult<Category> {
    let name = normalize_category_name(name)
        .ok_or_else(|| AppError::Validation("Category name cannot be empty".to_string()))?;

    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(&name)
        .execute(&mut *conn)
        .await?;

    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name FROM categories WHERE LOWER(name) = LOWER($1)",
    )
    .bind(&name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(category)
}

/// Category ids an item should carry: the requested ones (which must exist)
/// plus the inline new category, if any
pub(crate) async fn resolve(
    conn: &mut PgConnection,
    category_ids: &[Uuid],
    new_category: Option<&str>,
) -> AppResult<Vec<Uuid>> {
    let mut ids: Vec<Uuid> = Vec::new();
    for id in category_ids {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }

    if !ids.is_empty() {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_one(&mut *conn)
            .await?;
        if found != ids.len() as i64 {
            return Err(AppError::NotFound("One or more categories not found".to_string()));
        }
    }

    if let Some(name) = new_category.and_then(normalize_category_name) {
        let category = get_or_create(conn, &name).await?;
        if !ids.contains(&category.id) {
            ids.push(category.id);
        }
    }

    Ok(ids)
}

/// Replace the categories of an item
pub(crate) async fn set_item_categories(
    conn: &mut PgConnection,
    item_id: Uuid,
    category_ids: &[Uuid],
) -> AppResult<()> {
    sqlx::query("DELETE FROM item_categories WHERE item_id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO item_categories (item_id, category_id)
        SELECT $1, UNNEST($2::uuid[])
        "#,
    )
    .bind(item_id)
    .bind(category_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
