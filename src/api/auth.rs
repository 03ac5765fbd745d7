//! Current identity endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::user::UserInfo};

use super::AuthenticatedUser;

/// Get the current user, registering them on first sight
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user information", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    Ok(Json(state.services.users.user_info(&user).await))
}
