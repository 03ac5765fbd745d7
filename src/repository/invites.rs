//! Invites repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::collections::{fetch_collection, grant_access};
use crate::{
    access::{self, Viewer},
    error::{AppError, AppResult},
    models::{
        enums::InviteStatus,
        invite::{check_invite_request, InviteAction, InviteDetails},
        Invite,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT v.id, v.collection_id, v.requester_id, v.status, v.request_date, v.approved_date,
           c.name AS collection_name, u.username AS requester_username
    FROM invites v
    JOIN collections c ON c.id = v.collection_id
    JOIN users u ON u.id = v.requester_id
"#;

#[derive(Clone)]
pub struct InvitesRepository {
    pool: Pool<Postgres>,
}

impl InvitesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Ask for access to a collection
    pub async fn request(&self, collection_id: Uuid, requester_id: Uuid) -> AppResult<Invite> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent requests for the same collection
        fetch_collection(&mut tx, collection_id, true).await?;

        let existing = sqlx::query_as::<_, Invite>(
            "SELECT * FROM invites WHERE collection_id = $1 AND requester_id = $2",
        )
        .bind(collection_id)
        .bind(requester_id)
        .fetch_all(&mut *tx)
        .await?;

        check_invite_request(&existing)?;

        let invite = Invite::request(collection_id, requester_id, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO invites (id, collection_id, requester_id, status, request_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(invite.id)
        .bind(invite.collection_id)
        .bind(invite.requester_id)
        .bind(invite.status)
        .bind(invite.request_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invite)
    }

    /// Approve or reject a pending invite. Only the librarian who created the
    /// collection decides; approval puts the requester on the allow-list.
    pub async fn manage(&self, id: Uuid, action: InviteAction, actor: &Viewer) -> AppResult<Invite> {
        let mut tx = self.pool.begin().await?;

        let mut invite = sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invite with id {} not found", id)))?;

        let collection = fetch_collection(&mut tx, invite.collection_id, true).await?;
        if !access::can_manage_requests(actor, collection.created_by) {
            return Err(AppError::Authorization(
                "Only the librarian who created this collection can manage its invites".to_string(),
            ));
        }

        let grant = invite.apply(action, Utc::now())?;

        sqlx::query("UPDATE invites SET status = $1, approved_date = $2 WHERE id = $3")
            .bind(invite.status)
            .bind(invite.approved_date)
            .bind(invite.id)
            .execute(&mut *tx)
            .await?;

        if grant {
            grant_access(&mut tx, invite.collection_id, invite.requester_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            invite_id = %invite.id,
            collection_id = %invite.collection_id,
            status = %invite.status,
            "Invite decided"
        );

        Ok(invite)
    }

    /// Invites a patron sent, newest first
    pub async fn list_for_requester(&self, requester_id: Uuid) -> AppResult<Vec<InviteDetails>> {
        let rows = sqlx::query_as::<_, InviteDetails>(&format!(
            "{} WHERE v.requester_id = $1 ORDER BY v.request_date DESC",
            DETAILS_SELECT
        ))
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Pending invites for collections a librarian created
    pub async fn queue_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<InviteDetails>> {
        let rows = sqlx::query_as::<_, InviteDetails>(&format!(
            "{} WHERE c.created_by = $1 AND v.status = $2 ORDER BY v.request_date",
            DETAILS_SELECT
        ))
        .bind(owner_id)
        .bind(InviteStatus::Pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
