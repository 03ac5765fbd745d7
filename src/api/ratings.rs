//! Rating endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        rating::{CreateRating, ItemRatings, UpdateRating},
        Rating,
    },
};

use super::{AuthenticatedUser, MaybeUser};

/// Rate an item
#[utoipa::path(
    post,
    path = "/items/{id}/ratings",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body = CreateRating,
    responses(
        (status = 201, description = "Rating recorded", body = Rating),
        (status = 400, description = "Score out of range"),
        (status = 404, description = "Item not found or not visible"),
        (status = 409, description = "Item already rated by the caller")
    )
)]
pub async fn rate_item(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateRating>,
) -> AppResult<(StatusCode, Json<Rating>)> {
    let rating = state.services.ratings.rate(&user.viewer(), id, data).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// Ratings of an item with their average
#[utoipa::path(
    get,
    path = "/items/{id}/ratings",
    tag = "ratings",
    params(
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Ratings", body = ItemRatings),
        (status = 404, description = "Item not found or not visible")
    )
)]
pub async fn list_ratings(
    State(state): State<crate::AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemRatings>> {
    let ratings = state.services.ratings.list(&user.viewer(), id).await?;
    Ok(Json(ratings))
}

/// Edit own rating
#[utoipa::path(
    put,
    path = "/ratings/{id}",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rating ID")
    ),
    request_body = UpdateRating,
    responses(
        (status = 200, description = "Rating updated", body = Rating),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Rating not found")
    )
)]
pub async fn update_rating(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateRating>,
) -> AppResult<Json<Rating>> {
    let rating = state.services.ratings.update(&user.viewer(), id, data).await?;
    Ok(Json(rating))
}

/// Delete own rating
#[utoipa::path(
    delete,
    path = "/ratings/{id}",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Rating ID")
    ),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Rating not found")
    )
)]
pub async fn delete_rating(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.ratings.delete(&user.viewer(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
