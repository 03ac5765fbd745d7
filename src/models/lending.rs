//! Lending (borrow request) model and its state machine

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::LendingStatus;
use crate::error::{AppError, AppResult};

/// Librarian decision on a lending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LendingAction {
    Approve,
    Reject,
    Return,
}

/// Lending model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lending {
    pub id: Uuid,
    pub item_id: Uuid,
    pub borrower_id: Uuid,
    pub status: LendingStatus,
    pub request_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub return_requested: bool,
}

impl Lending {
    /// New pending request
    pub fn request(item_id: Uuid, borrower_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            borrower_id,
            status: LendingStatus::Pending,
            request_date: now,
            approved_date: None,
            due_date: None,
            return_date: None,
            return_requested: false,
        }
    }

    /// Pending or approved lendings hold the item
    pub fn is_active(&self) -> bool {
        matches!(self.status, LendingStatus::Pending | LendingStatus::Approved)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LendingStatus::Approved && self.due_date.map(|d| d < now).unwrap_or(false)
    }

    /// Apply a librarian decision. Returns the availability the item must take,
    /// or `None` when it stays as it is. Only `pending -> approved|rejected` and
    /// `approved -> returned` are legal; anything else is a conflict.
    pub fn apply(
        &mut self,
        action: LendingAction,
        now: DateTime<Utc>,
        loan_period: Duration,
    ) -> AppResult<Option<bool>> {
        match (self.status, action) {
            (LendingStatus::Pending, LendingAction::Approve) => {
                self.status = LendingStatus::Approved;
                self.approved_date = Some(now);
                self.due_date = Some(now + loan_period);
                Ok(None)
            }
            (LendingStatus::Pending, LendingAction::Reject) => {
                self.status = LendingStatus::Rejected;
                Ok(Some(true))
            }
            (LendingStatus::Approved, LendingAction::Return) => {
                self.status = LendingStatus::Returned;
                self.return_date = Some(now);
                Ok(Some(true))
            }
            (status, action) => Err(AppError::Conflict(format!(
                "Cannot {:?} a lending that is {}",
                action, status
            ))),
        }
    }

    /// Patron asks to hand the item back. Returns whether the flag was newly set.
    pub fn request_return(&mut self, patron_id: Uuid) -> AppResult<bool> {
        if self.borrower_id != patron_id {
            return Err(AppError::Authorization(
                "Only the borrower can request a return".to_string(),
            ));
        }
        if self.status != LendingStatus::Approved {
            return Err(AppError::Authorization(
                "Only approved lendings can be returned".to_string(),
            ));
        }
        if self.return_requested {
            return Ok(false);
        }
        self.return_requested = true;
        Ok(true)
    }
}

/// Check a new borrow request against the item's availability and the
/// patron's existing lendings of the same item
pub fn check_borrow_request(item_available: bool, existing: &[Lending]) -> AppResult<()> {
    if !item_available {
        return Err(AppError::Conflict("Item is not available".to_string()));
    }
    if existing.iter().any(Lending::is_active) {
        return Err(AppError::Conflict(
            "You already have an active request for this item".to_string(),
        ));
    }
    Ok(())
}

/// Lending with display context
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LendingDetails {
    #[sqlx(flatten)]
    pub lending: Lending,
    pub item_name: String,
    pub borrower_username: String,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

/// Manage lending request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManageLending {
    pub action: LendingAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Lending {
        Lending::request(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_approve_then_return() {
        let mut lending = pending();
        let approved_at = Utc::now();

        assert_eq!(
            lending.apply(LendingAction::Approve, approved_at, Duration::days(14)).unwrap(),
            None
        );
        assert_eq!(lending.status, LendingStatus::Approved);
        assert_eq!(lending.approved_date, Some(approved_at));
        assert_eq!(lending.due_date, Some(approved_at + Duration::days(14)));

        let returned_at = approved_at + Duration::days(3);
        assert_eq!(
            lending.apply(LendingAction::Return, returned_at, Duration::days(14)).unwrap(),
            Some(true)
        );
        assert_eq!(lending.status, LendingStatus::Returned);
        assert_eq!(lending.return_date, Some(returned_at));
        assert!(!lending.is_active());
    }

    #[test]
    fn test_reject_releases_item() {
        let mut lending = pending();
        assert_eq!(
            lending.apply(LendingAction::Reject, Utc::now(), Duration::days(14)).unwrap(),
            Some(true)
        );
        assert_eq!(lending.status, LendingStatus::Rejected);
        assert_eq!(lending.approved_date, None);
    }

    #[test]
    fn test_illegal_transitions_conflict() {
        let now = Utc::now();
        let period = Duration::days(14);

        let mut lending = pending();
        assert!(matches!(
            lending.apply(LendingAction::Return, now, period),
            Err(AppError::Conflict(_))
        ));

        lending.apply(LendingAction::Approve, now, period).unwrap();
        let due = lending.due_date;
        let later = now + Duration::days(1);
        assert!(matches!(
            lending.apply(LendingAction::Approve, later, period),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(lending.due_date, due);
        assert!(lending.apply(LendingAction::Reject, later, period).is_err());

        lending.apply(LendingAction::Return, later, period).unwrap();
        assert!(lending.apply(LendingAction::Return, later, period).is_err());
    }

    #[test]
    fn test_request_return_is_idempotent() {
        let mut lending = pending();
        let borrower = lending.borrower_id;
        lending.apply(LendingAction::Approve, Utc::now(), Duration::days(14)).unwrap();

        assert!(lending.request_return(borrower).unwrap());
        assert!(!lending.request_return(borrower).unwrap());
        assert!(lending.return_requested);
        assert_eq!(lending.status, LendingStatus::Approved);
    }

    #[test]
    fn test_request_return_guards() {
        let mut lending = pending();
        let borrower = lending.borrower_id;
        assert!(matches!(
            lending.request_return(borrower),
            Err(AppError::Authorization(_))
        ));

        lending.apply(LendingAction::Approve, Utc::now(), Duration::days(14)).unwrap();
        assert!(matches!(
            lending.request_return(Uuid::new_v4()),
            Err(AppError::Authorization(_))
        ));
        assert!(!lending.return_requested);
    }

    #[test]
    fn test_borrow_request_checks() {
        assert!(check_borrow_request(true, &[]).is_ok());
        assert!(matches!(check_borrow_request(false, &[]), Err(AppError::Conflict(_))));

        let active = pending();
        assert!(matches!(
            check_borrow_request(true, &[active.clone()]),
            Err(AppError::Conflict(_))
        ));

        let mut finished = active;
        finished.apply(LendingAction::Reject, Utc::now(), Duration::days(14)).unwrap();
        assert!(check_borrow_request(true, &[finished]).is_ok());
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut lending = pending();
        assert!(!lending.is_overdue(now));
        lending.apply(LendingAction::Approve, now - Duration::days(20), Duration::days(14)).unwrap();
        assert!(lending.is_overdue(now));
    }
}
