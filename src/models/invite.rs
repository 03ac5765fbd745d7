//! Invite (private collection access request) model and its state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::InviteStatus;
use crate::error::{AppError, AppResult};

/// Collection owner decision on an invite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InviteAction {
    Approve,
    Reject,
}

/// Invite model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invite {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub requester_id: Uuid,
    pub status: InviteStatus,
    pub request_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
}

impl Invite {
    pub fn request(collection_id: Uuid, requester_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection_id,
            requester_id,
            status: InviteStatus::Pending,
            request_date: now,
            approved_date: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, InviteStatus::Pending | InviteStatus::Approved)
    }

    /// Apply a decision on a pending invite. Returns whether the requester must
    /// be added to the collection's allow-list.
    pub fn apply(&mut self, action: InviteAction, now: DateTime<Utc>) -> AppResult<bool> {
        if self.status != InviteStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Invite has already been {}",
                self.status
            )));
        }
        match action {
            InviteAction::Approve => {
                self.status = InviteStatus::Approved;
                self.approved_date = Some(now);
                Ok(true)
            }
            InviteAction::Reject => {
                self.status = InviteStatus::Rejected;
                Ok(false)
            }
        }
    }
}

/// Refuse a new request while one is pending or already approved
pub fn check_invite_request(existing: &[Invite]) -> AppResult<()> {
    if existing.iter().any(Invite::is_active) {
        return Err(AppError::Conflict(
            "You already requested access to this collection".to_string(),
        ));
    }
    Ok(())
}

/// Invite with display context
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InviteDetails {
    #[sqlx(flatten)]
    pub invite: Invite,
    pub collection_name: String,
    pub requester_username: String,
}

/// Manage invite request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManageInvite {
    pub action: InviteAction,
}
