//! Collection endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        collection::{CollectionDetails, CreateCollection, UpdateCollection},
        Invite,
    },
};

use super::{AuthenticatedUser, MaybeUser};

/// Create a collection
#[utoipa::path(
    post,
    path = "/collections",
    tag = "collections",
    security(("bearer_auth" = [])),
    request_body = CreateCollection,
    responses(
        (status = 201, description = "Collection created", body = CollectionDetails),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_collection(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(data): Json<CreateCollection>,
) -> AppResult<(StatusCode, Json<CollectionDetails>)> {
    let created = state
        .services
        .catalog
        .create_collection(&user.viewer(), data)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a collection with the items the caller may see
#[utoipa::path(
    get,
    path = "/collections/{id}",
    tag = "collections",
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    responses(
        (status = 200, description = "Collection details", body = CollectionDetails),
        (status = 404, description = "Collection not found or not visible")
    )
)]
pub async fn get_collection(
    State(state): State<crate::AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CollectionDetails>> {
    let details = state.services.catalog.get_collection(&user.viewer(), id).await?;
    Ok(Json(details))
}

/// Edit a collection
#[utoipa::path(
    put,
    path = "/collections/{id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    request_body = UpdateCollection,
    responses(
        (status = 200, description = "Collection updated", body = CollectionDetails),
        (status = 400, description = "Invalid input or privacy conflict"),
        (status = 403, description = "Not allowed to modify this collection"),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn update_collection(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateCollection>,
) -> AppResult<Json<CollectionDetails>> {
    let details = state
        .services
        .catalog
        .update_collection(&user.viewer(), id, data)
        .await?;
    Ok(Json(details))
}

/// Delete a collection
#[utoipa::path(
    delete,
    path = "/collections/{id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 403, description = "Not allowed to delete this collection"),
        (status = 404, description = "Collection not found")
    )
)]
pub async fn delete_collection(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_collection(&user.viewer(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove an item from a collection
#[utoipa::path(
    delete,
    path = "/collections/{id}/items/{item_id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item removed from the collection"),
        (status = 403, description = "Not allowed to modify this collection"),
        (status = 404, description = "Collection, item or membership not found")
    )
)]
pub async fn remove_item(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .catalog
        .remove_item_from_collection(&user.viewer(), id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke a patron's access to a private collection
#[utoipa::path(
    delete,
    path = "/collections/{id}/patrons/{patron_id}",
    tag = "collections",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID"),
        ("patron_id" = Uuid, Path, description = "Patron user ID")
    ),
    responses(
        (status = 204, description = "Access removed"),
        (status = 400, description = "The creator cannot be removed"),
        (status = 403, description = "Not allowed to modify this collection"),
        (status = 404, description = "Collection or access not found")
    )
)]
pub async fn remove_patron(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path((id, patron_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state
        .services
        .catalog
        .remove_patron_access(&user.viewer(), id, patron_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ask for access to a collection
#[utoipa::path(
    post,
    path = "/collections/{id}/invites",
    tag = "invites",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    responses(
        (status = 201, description = "Invite requested", body = Invite),
        (status = 403, description = "Only patrons can request invites"),
        (status = 404, description = "Collection not found"),
        (status = 409, description = "An invite is already pending or approved")
    )
)]
pub async fn request_invite(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Invite>)> {
    let invite = state.services.invites.request(&user.viewer(), id).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}
