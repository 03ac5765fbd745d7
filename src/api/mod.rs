//! API handlers for Wardrobe REST endpoints

pub mod auth;
pub mod browse;
pub mod collections;
pub mod health;
pub mod invites;
pub mod items;
pub mod lendings;
pub mod media;
pub mod openapi;
pub mod ratings;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::Multipart;

use crate::{access::Viewer, error::AppError, models::User, storage::Upload, AppState};

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AppError::Authentication("Invalid authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))
}

/// Extractor for the user behind the bearer token. The role always comes from
/// the database; unknown identities are registered as patrons.
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn viewer(&self) -> Viewer {
        self.0.viewer()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let claims = state.services.users.verify_token(token)?;
        let user = state.services.users.resolve(&claims).await?;

        Ok(AuthenticatedUser(user))
    }
}

/// Like [`AuthenticatedUser`], but anonymous requests go through as guests
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn viewer(&self) -> Viewer {
        self.0.as_ref().map(User::viewer).unwrap_or(Viewer::Guest)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(MaybeUser(None)),
            Some(token) => {
                let claims = state.services.users.verify_token(token)?;
                let user = state.services.users.resolve(&claims).await?;
                Ok(MaybeUser(Some(user)))
            }
        }
    }
}

/// Parts of a multipart form: an optional JSON `data` part and an optional
/// file part named `image`
#[derive(Default)]
pub struct FormParts {
    pub data: Option<String>,
    pub image: Option<Upload>,
}

pub async fn read_form(mut multipart: Multipart) -> Result<FormParts, AppError> {
    let mut form = FormParts::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "data" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.data = Some(text);
            }
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                // Browsers send an empty part when no file was picked
                if !bytes.is_empty() || file_name.as_deref().is_some_and(|n| !n.is_empty()) {
                    form.image = Some(Upload {
                        bytes: bytes.to_vec(),
                        content_type,
                        file_name,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Image part of a form that must carry one
pub async fn read_image(multipart: Multipart) -> Result<Upload, AppError> {
    read_form(multipart)
        .await?
        .image
        .ok_or_else(|| AppError::BadRequest("Missing required 'image' field".to_string()))
}
