//! Item (garment) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        collection::AddToCollections,
        item::{CreateItem, ItemDetails, ItemWithWarnings, UpdateItem},
        Item,
    },
};

use super::{read_form, read_image, AuthenticatedUser, MaybeUser};

/// Create an item
///
/// Multipart form: a `data` part holding the item as JSON and an optional
/// `image` file part. When the image cannot be stored the item is still
/// created and the failure is reported in `warnings`.
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body(content = CreateItem, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Item created", body = ItemWithWarnings),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not a librarian")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ItemWithWarnings>)> {
    let form = read_form(multipart).await?;
    let data = form
        .data
        .ok_or_else(|| AppError::BadRequest("Missing required 'data' field".to_string()))?;
    let data: CreateItem = serde_json::from_str(&data)
        .map_err(|e| AppError::BadRequest(format!("Invalid item data: {}", e)))?;

    let created = state
        .services
        .catalog
        .create_item(&user.viewer(), data, form.image)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = ItemDetails),
        (status = 404, description = "Item not found or not visible")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemDetails>> {
    let item = state.services.catalog.get_item(&user.viewer(), id).await?;
    Ok(Json(item))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.update_item(&user.viewer(), id, data).await?;
    Ok(Json(item))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_item(&user.viewer(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the item picture (multipart, `image` part)
#[utoipa::path(
    put,
    path = "/items/{id}/image",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Image replaced", body = Item),
        (status = 400, description = "Missing or invalid image"),
        (status = 502, description = "Object storage unavailable")
    )
)]
pub async fn upload_item_image(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<Item>> {
    let upload = read_image(multipart).await?;
    let item = state
        .services
        .catalog
        .set_item_image(&user.viewer(), id, upload)
        .await?;
    Ok(Json(item))
}

/// Add an item to one or more collections
#[utoipa::path(
    post,
    path = "/items/{id}/collections",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = AddToCollections,
    responses(
        (status = 200, description = "Item with its collections", body = ItemDetails),
        (status = 400, description = "A private collection must be the only collection of its items"),
        (status = 403, description = "Not allowed to modify a target collection"),
        (status = 404, description = "Item or collection not found")
    )
)]
pub async fn add_to_collections(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AddToCollections>,
) -> AppResult<Json<ItemDetails>> {
    let item = state
        .services
        .catalog
        .add_item_to_collections(&user.viewer(), id, &request.collection_ids)
        .await?;
    Ok(Json(item))
}
