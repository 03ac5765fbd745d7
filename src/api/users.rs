//! Role management and patron profile endpoints

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{PromoteRequest, PromotionOutcome, UpdatePatronProfile, UserInfo},
};

use super::{read_image, AuthenticatedUser};

#[derive(Serialize, ToSchema)]
pub struct PromoteResponse {
    pub email: String,
    pub outcome: PromotionOutcome,
}

/// Promote a user to librarian by email
#[utoipa::path(
    post,
    path = "/users/promote",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = PromoteRequest,
    responses(
        (status = 200, description = "Promotion result", body = PromoteResponse),
        (status = 403, description = "Not a librarian"),
        (status = 404, description = "No user with this email")
    )
)]
pub async fn promote(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<PromoteRequest>,
) -> AppResult<Json<PromoteResponse>> {
    request.validate()?;

    let outcome = state.services.users.promote(&user, &request.email).await?;
    Ok(Json(PromoteResponse {
        email: request.email,
        outcome,
    }))
}

/// Update own patron profile
#[utoipa::path(
    put,
    path = "/patrons/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdatePatronProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserInfo),
        (status = 403, description = "Not a patron")
    )
)]
pub async fn update_my_profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(data): Json<UpdatePatronProfile>,
) -> AppResult<Json<UserInfo>> {
    let info = state.services.users.update_profile(&user, data).await?;
    Ok(Json(info))
}

/// Upload or replace own profile image (multipart, `image` part)
#[utoipa::path(
    put,
    path = "/patrons/me/image",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile image updated", body = UserInfo),
        (status = 400, description = "Missing or invalid image"),
        (status = 502, description = "Object storage unavailable")
    )
)]
pub async fn upload_my_image(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<UserInfo>> {
    let upload = read_image(multipart).await?;
    let info = state.services.users.set_avatar(&user, upload).await?;
    Ok(Json(info))
}

/// Remove own profile image
#[utoipa::path(
    delete,
    path = "/patrons/me/image",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile image removed", body = UserInfo)
    )
)]
pub async fn delete_my_image(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let info = state.services.users.remove_avatar(&user).await?;
    Ok(Json(info))
}
