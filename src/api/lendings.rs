//! Lending endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        lending::{LendingDetails, ManageLending},
        Lending,
    },
};

use super::AuthenticatedUser;

/// Ask to borrow an item
#[utoipa::path(
    post,
    path = "/items/{id}/borrow",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 201, description = "Borrow request recorded", body = Lending),
        (status = 403, description = "Only patrons can borrow"),
        (status = 404, description = "Item not found or not visible"),
        (status = 409, description = "Item unavailable or already requested")
    )
)]
pub async fn request_borrow(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Lending>)> {
    let lending = state.services.lendings.request_borrow(&user.viewer(), id).await?;
    Ok((StatusCode::CREATED, Json(lending)))
}

/// Lendings of the caller
#[utoipa::path(
    get,
    path = "/lendings/mine",
    tag = "lendings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own lendings, newest first", body = Vec<LendingDetails>)
    )
)]
pub async fn my_lendings(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<LendingDetails>>> {
    let lendings = state.services.lendings.list_mine(&user.viewer()).await?;
    Ok(Json(lendings))
}

/// Requests and returns awaiting the caller's decision
#[utoipa::path(
    get,
    path = "/lendings/queue",
    tag = "lendings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests and requested returns", body = Vec<LendingDetails>),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn lending_queue(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<LendingDetails>>> {
    let lendings = state.services.lendings.queue(&user.viewer()).await?;
    Ok(Json(lendings))
}

/// Approve, reject or close a lending
#[utoipa::path(
    post,
    path = "/lendings/{id}/manage",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Lending ID")
    ),
    request_body = ManageLending,
    responses(
        (status = 200, description = "Lending updated", body = Lending),
        (status = 403, description = "Not the librarian who owns the item"),
        (status = 404, description = "Lending not found"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
pub async fn manage_lending(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ManageLending>,
) -> AppResult<Json<Lending>> {
    let lending = state
        .services
        .lendings
        .manage(&user.viewer(), id, request.action)
        .await?;
    Ok(Json(lending))
}

/// Tell the owner an approved loan is ready to be returned
#[utoipa::path(
    post,
    path = "/lendings/{id}/request-return",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Lending ID")
    ),
    responses(
        (status = 200, description = "Return requested", body = Lending),
        (status = 403, description = "Not the borrower, or the lending is not approved"),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn request_return(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Lending>> {
    let lending = state.services.lendings.request_return(&user.viewer(), id).await?;
    Ok(Json(lending))
}
