//! Signed media downloads

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppResult;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedQuery {
    /// Unix timestamp after which the link stops working
    pub expires: i64,
    pub signature: String,
}

/// Serve a stored image behind a signed link
#[utoipa::path(
    get,
    path = "/media/{key}",
    tag = "media",
    params(
        ("key" = String, Path, description = "Object key, e.g. items/<uuid>.jpg"),
        SignedQuery
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 403, description = "Invalid or expired signature"),
        (status = 404, description = "Object not found")
    )
)]
pub async fn get_media(
    State(state): State<crate::AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> AppResult<impl IntoResponse> {
    let (bytes, content_type) = state
        .services
        .media
        .fetch(&key, query.expires, &query.signature)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "private, max-age=3600"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        bytes,
    ))
}
