//! Invites to private collections

use uuid::Uuid;

use crate::{
    access::Viewer,
    error::AppResult,
    models::{
        invite::{InviteAction, InviteDetails},
        Invite,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct InvitesService {
    repository: Repository,
}

impl InvitesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn request(&self, viewer: &Viewer, collection_id: Uuid) -> AppResult<Invite> {
        let patron_id = viewer.require_patron()?;
        let invite = self.repository.invites.request(collection_id, patron_id).await?;
        tracing::info!(
            invite_id = %invite.id,
            collection_id = %collection_id,
            requester_id = %patron_id,
            "Invite requested"
        );
        Ok(invite)
    }

    pub async fn manage(&self, viewer: &Viewer, id: Uuid, action: InviteAction) -> AppResult<Invite> {
        viewer.require_librarian()?;
        self.repository.invites.manage(id, action, viewer).await
    }

    pub async fn list_mine(&self, viewer: &Viewer) -> AppResult<Vec<InviteDetails>> {
        let user_id = viewer.require_authenticated()?;
        self.repository.invites.list_for_requester(user_id).await
    }

    pub async fn queue(&self, viewer: &Viewer) -> AppResult<Vec<InviteDetails>> {
        let librarian_id = viewer.require_librarian()?;
        self.repository.invites.queue_for_owner(librarian_id).await
    }
}
