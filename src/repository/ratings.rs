//! Ratings repository

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        rating::{CreateRating, UpdateRating},
        Rating,
    },
};

#[derive(Clone)]
pub struct RatingsRepository {
    pool: Pool<Postgres>,
}

impl RatingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Ratings of an item, newest first
    pub async fn list_for_item(&self, item_id: Uuid) -> AppResult<Vec<Rating>> {
        let rows = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE item_id = $1 ORDER BY rate_date DESC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn average_for_item(&self, item_id: Uuid) -> AppResult<Option<f64>> {
        let average: Option<f64> =
            sqlx::query_scalar("SELECT AVG(num_rating)::float8 FROM ratings WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(average)
    }

    /// One rating per (item, patron)
    pub async fn create(&self, item_id: Uuid, rater_id: Uuid, data: &CreateRating) -> AppResult<Rating> {
        let mut tx = self.pool.begin().await?;

        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
        }

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ratings WHERE item_id = $1 AND rater_id = $2)",
        )
        .bind(item_id)
        .bind(rater_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(AppError::Conflict("You already rated this item".to_string()));
        }

        let rating = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (id, item_id, rater_id, rate_date, num_rating, comment)
            VALUES ($1, $2, $3, NOW(), $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(rater_id)
        .bind(data.num_rating)
        .bind(&data.comment)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rating)
    }

    /// Edit a rating; only its author may
    pub async fn update(&self, id: Uuid, author_id: Uuid, data: &UpdateRating) -> AppResult<Rating> {
        let mut tx = self.pool.begin().await?;

        let rating = sqlx::query_as::<_, Rating>("SELECT * FROM ratings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating with id {} not found", id)))?;
        rating.require_author(author_id)?;

        let rating = sqlx::query_as::<_, Rating>(
            r#"
            UPDATE ratings SET
                num_rating = COALESCE($2, num_rating),
                comment = COALESCE($3, comment),
                rate_date = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.num_rating)
        .bind(&data.comment)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rating)
    }

    /// Delete a rating; only its author may
    pub async fn delete(&self, id: Uuid, author_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let rating = sqlx::query_as::<_, Rating>("SELECT * FROM ratings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating with id {} not found", id)))?;
        rating.require_author(author_id)?;

        sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
