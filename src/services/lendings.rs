//! Lending management service

use chrono::Duration;
use uuid::Uuid;

use super::catalog::visible_item;
use crate::{
    access::Viewer,
    config::LendingConfig,
    error::AppResult,
    models::{
        lending::{LendingAction, LendingDetails},
        Lending,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingsService {
    repository: Repository,
    loan_period: Duration,
}

impl LendingsService {
    pub fn new(repository: Repository, config: &LendingConfig) -> Self {
        Self {
            repository,
            loan_period: Duration::days(config.loan_period_days),
        }
    }

    /// Ask to borrow an item the patron can see
    pub async fn request_borrow(&self, viewer: &Viewer, item_id: Uuid) -> AppResult<Lending> {
        let patron_id = viewer.require_patron()?;
        visible_item(&self.repository, viewer, item_id).await?;

        let lending = self.repository.lendings.request(item_id, patron_id).await?;
        tracing::info!(
            lending_id = %lending.id,
            item_id = %item_id,
            borrower_id = %patron_id,
            "Borrow requested"
        );
        Ok(lending)
    }

    /// Approve, reject or close a lending
    pub async fn manage(&self, viewer: &Viewer, id: Uuid, action: LendingAction) -> AppResult<Lending> {
        viewer.require_librarian()?;
        self.repository
            .lendings
            .manage(id, action, viewer, self.loan_period)
            .await
    }

    pub async fn request_return(&self, viewer: &Viewer, id: Uuid) -> AppResult<Lending> {
        let patron_id = viewer.require_patron()?;
        let lending = self.repository.lendings.request_return(id, patron_id).await?;
        tracing::info!(lending_id = %id, "Return requested");
        Ok(lending)
    }

    pub async fn list_mine(&self, viewer: &Viewer) -> AppResult<Vec<LendingDetails>> {
        let user_id = viewer.require_authenticated()?;
        self.repository.lendings.list_for_borrower(user_id).await
    }

    /// Requests waiting on the librarian's decision
    pub async fn queue(&self, viewer: &Viewer) -> AppResult<Vec<LendingDetails>> {
        let librarian_id = viewer.require_librarian()?;
        self.repository.lendings.queue_for_owner(librarian_id).await
    }
}
