//! Lendings repository for database operations

use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Viewer},
    error::{AppError, AppResult},
    models::{
        enums::LendingStatus,
        lending::{check_borrow_request, LendingAction, LendingDetails},
        Lending,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.item_id, l.borrower_id, l.status, l.request_date, l.approved_date,
           l.due_date, l.return_date, l.return_requested,
           i.name AS item_name, u.username AS borrower_username
    FROM lendings l
    JOIN items i ON i.id = l.item_id
    JOIN users u ON u.id = l.borrower_id
"#;

#[derive(Clone)]
pub struct LendingsRepository {
    pool: Pool<Postgres>,
}

impl LendingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record a borrow request and take the item off the shelf.
    /// Visibility of the item is checked by the caller.
    pub async fn request(&self, item_id: Uuid, borrower_id: Uuid) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let available: bool = sqlx::query_scalar("SELECT available FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        let existing = sqlx::query_as::<_, Lending>(
            "SELECT * FROM lendings WHERE item_id = $1 AND borrower_id = $2",
        )
        .bind(item_id)
        .bind(borrower_id)
        .fetch_all(&mut *tx)
        .await?;

        check_borrow_request(available, &existing)?;

        let lending = Lending::request(item_id, borrower_id, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO lendings (id, item_id, borrower_id, status, request_date, return_requested)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            "#,
        )
        .bind(lending.id)
        .bind(lending.item_id)
        .bind(lending.borrower_id)
        .bind(lending.status)
        .bind(lending.request_date)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE items SET available = FALSE, modified_at = NOW() WHERE id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(lending)
    }

    /// Apply a librarian decision. Only the librarian who cataloged the item
    /// may decide; the lending and the item are locked for the transition.
    pub async fn manage(
        &self,
        id: Uuid,
        action: LendingAction,
        actor: &Viewer,
        loan_period: Duration,
    ) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let mut lending = sqlx::query_as::<_, Lending>("SELECT * FROM lendings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending with id {} not found", id)))?;

        let owner_id: Uuid = sqlx::query_scalar("SELECT created_by FROM items WHERE id = $1 FOR UPDATE")
            .bind(lending.item_id)
            .fetch_one(&mut *tx)
            .await?;

        if !access::can_manage_requests(actor, owner_id) {
            return Err(AppError::Authorization(
                "Only the librarian who owns this item can manage its lendings".to_string(),
            ));
        }

        let previous = lending.status;
        let availability = lending.apply(action, Utc::now(), loan_period)?;

        sqlx::query(
            r#"
            UPDATE lendings
            SET status = $1, approved_date = $2, due_date = $3, return_date = $4
            WHERE id = $5
            "#,
        )
        .bind(lending.status)
        .bind(lending.approved_date)
        .bind(lending.due_date)
        .bind(lending.return_date)
        .bind(lending.id)
        .execute(&mut *tx)
        .await?;

        if let Some(available) = availability {
            sqlx::query("UPDATE items SET available = $1, modified_at = NOW() WHERE id = $2")
                .bind(available)
                .bind(lending.item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            lending_id = %lending.id,
            item_id = %lending.item_id,
            from = %previous,
            to = %lending.status,
            "Lending transition"
        );

        Ok(lending)
    }

    /// Flag an approved lending as ready to be handed back
    pub async fn request_return(&self, id: Uuid, patron_id: Uuid) -> AppResult<Lending> {
        let mut tx = self.pool.begin().await?;

        let mut lending = sqlx::query_as::<_, Lending>("SELECT * FROM lendings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending with id {} not found", id)))?;

        if lending.request_return(patron_id)? {
            sqlx::query("UPDATE lendings SET return_requested = TRUE WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(lending)
    }

    /// Lendings of a patron, newest first
    pub async fn list_for_borrower(&self, borrower_id: Uuid) -> AppResult<Vec<LendingDetails>> {
        let rows = sqlx::query_as::<_, LendingDetails>(&format!(
            "{} WHERE l.borrower_id = $1 ORDER BY l.request_date DESC",
            DETAILS_SELECT
        ))
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(with_overdue(rows))
    }

    /// Pending requests and loans awaiting return for items a librarian cataloged
    pub async fn queue_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<LendingDetails>> {
        let rows = sqlx::query_as::<_, LendingDetails>(&format!(
            r#"{}
            WHERE i.created_by = $1
              AND (l.status = $2 OR (l.status = $3 AND l.return_requested))
            ORDER BY l.request_date"#,
            DETAILS_SELECT
        ))
        .bind(owner_id)
        .bind(LendingStatus::Pending)
        .bind(LendingStatus::Approved)
        .fetch_all(&self.pool)
        .await?;
        Ok(with_overdue(rows))
    }
}

fn with_overdue(mut rows: Vec<LendingDetails>) -> Vec<LendingDetails> {
    let now = Utc::now();
    for row in &mut rows {
        row.is_overdue = row.lending.is_overdue(now);
    }
    rows
}
