//! Identity, roles and patron profiles

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::RoleKind,
        user::{IdentityClaims, PromotionOutcome, RoleChange, UpdatePatronProfile, User, UserInfo},
    },
    repository::Repository,
    storage::Upload,
};

use super::media::{MediaService, AVATARS};
use validator::Validate;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    media: MediaService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, media: MediaService) -> Self {
        Self {
            repository,
            config,
            media,
        }
    }

    /// Verify a bearer token issued by the identity provider
    pub fn verify_token(&self, token: &str) -> AppResult<IdentityClaims> {
        IdentityClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    /// User behind verified claims. Someone seen for the first time is
    /// registered as a patron, with the email as username, unless the email
    /// is a configured bootstrap librarian.
    pub async fn resolve(&self, claims: &IdentityClaims) -> AppResult<User> {
        if let Some(user) = self.repository.users.get_by_email(&claims.email).await? {
            return Ok(user);
        }
        let user = self.repository.users.create(&claims.to_new_user()).await?;
        tracing::info!(user_id = %user.id, subject = %claims.sub, "Registered new patron");

        if self.config.is_bootstrap_librarian(&user.email) && !user.is_librarian() {
            let (user, _) = self
                .repository
                .users
                .set_role(user.id, RoleKind::Librarian)
                .await?;
            tracing::info!(user_id = %user.id, "Bootstrap librarian registered");
            return Ok(user);
        }
        Ok(user)
    }

    /// Make the user with `email` a librarian. Only librarians may promote.
    pub async fn promote(&self, actor: &User, email: &str) -> AppResult<PromotionOutcome> {
        if !actor.is_librarian() {
            return Err(AppError::Authorization(
                "Only librarians can promote users".to_string(),
            ));
        }

        let target = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with email {}", email)))?;

        let (_, change) = self
            .repository
            .users
            .set_role(target.id, RoleKind::Librarian)
            .await?;

        match change {
            RoleChange::Unchanged => Ok(PromotionOutcome::AlreadyLibrarian),
            RoleChange::Swapped { from, to } => {
                tracing::info!(
                    user_id = %target.id,
                    promoted_by = %actor.id,
                    from = %from,
                    to = %to,
                    "Role changed"
                );
                Ok(PromotionOutcome::Promoted)
            }
        }
    }

    /// Public view of a user, with a fresh avatar link for patrons
    pub async fn user_info(&self, user: &User) -> UserInfo {
        let image_url = match user.role.as_patron() {
            Some(profile) => Some(self.media.avatar_link(profile.image.as_ref()).await),
            None => None,
        };
        UserInfo::new(user, image_url)
    }

    pub async fn update_profile(&self, user: &User, data: UpdatePatronProfile) -> AppResult<UserInfo> {
        user.viewer().require_patron()?;
        data.validate()?;

        let Some(display_name) = data.display_name_change() else {
            return Ok(self.user_info(user).await);
        };
        let user = self
            .repository
            .users
            .update_patron_profile(user.id, display_name)
            .await?;
        Ok(self.user_info(&user).await)
    }

    /// Upload a new profile picture, replacing the previous one
    pub async fn set_avatar(&self, user: &User, upload: Upload) -> AppResult<UserInfo> {
        user.viewer().require_patron()?;

        let image = self.media.upload(AVATARS, upload).await?;
        let previous = match self.repository.users.set_patron_image(user.id, Some(&image)).await {
            Ok(previous) => previous,
            Err(e) => {
                self.media.discard(Some(image)).await;
                return Err(e);
            }
        };
        self.media.discard(previous).await;

        let user = self.repository.users.get_by_id(user.id).await?;
        Ok(self.user_info(&user).await)
    }

    /// Go back to the placeholder picture
    pub async fn remove_avatar(&self, user: &User) -> AppResult<UserInfo> {
        user.viewer().require_patron()?;

        let previous = self.repository.users.set_patron_image(user.id, None).await?;
        self.media.discard(previous).await;

        let user = self.repository.users.get_by_id(user.id).await?;
        Ok(self.user_info(&user).await)
    }
}
