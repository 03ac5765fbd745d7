//! Browse and category endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        item::{BrowseQuery, BrowseResult},
        Category,
    },
};

use super::MaybeUser;

/// Browse the catalog, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/browse",
    tag = "browse",
    params(BrowseQuery),
    responses(
        (status = 200, description = "Items, collections and categories visible to the caller", body = BrowseResult)
    )
)]
pub async fn browse(
    State(state): State<crate::AppState>,
    user: MaybeUser,
    Query(query): Query<BrowseQuery>,
) -> AppResult<Json<BrowseResult>> {
    let result = state.services.browse.browse(&user.viewer(), query.q).await?;
    Ok(Json(result))
}

/// List all categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "browse",
    responses(
        (status = 200, description = "Categories sorted by name", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}
