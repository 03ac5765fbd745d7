//! Invite endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        invite::{InviteDetails, ManageInvite},
        Invite,
    },
};

use super::AuthenticatedUser;

/// Invites the caller sent
#[utoipa::path(
    get,
    path = "/invites/mine",
    tag = "invites",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own invites, newest first", body = Vec<InviteDetails>)
    )
)]
pub async fn my_invites(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<InviteDetails>>> {
    let invites = state.services.invites.list_mine(&user.viewer()).await?;
    Ok(Json(invites))
}

/// Pending invites for the caller's collections
#[utoipa::path(
    get,
    path = "/invites/queue",
    tag = "invites",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending invites", body = Vec<InviteDetails>),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn invite_queue(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<InviteDetails>>> {
    let invites = state.services.invites.queue(&user.viewer()).await?;
    Ok(Json(invites))
}

/// Approve or reject an invite
#[utoipa::path(
    post,
    path = "/invites/{id}/manage",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invite ID")
    ),
    request_body = ManageInvite,
    responses(
        (status = 200, description = "Invite decided", body = Invite),
        (status = 403, description = "Not the librarian who created the collection"),
        (status = 404, description = "Invite not found"),
        (status = 409, description = "Invite already decided")
    )
)]
pub async fn manage_invite(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ManageInvite>,
) -> AppResult<Json<Invite>> {
    let invite = state
        .services
        .invites
        .manage(&user.viewer(), id, request.action)
        .await?;
    Ok(Json(invite))
}
