//! User model, role profiles and identity claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{enums::RoleKind, image::ImageRef};
use crate::access::Viewer;

/// Profile held while a user is a librarian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarianProfile {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Profile held while a user is a patron
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatronProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    /// `None` until the patron uploads a picture; the placeholder is shown meanwhile
    pub image: Option<ImageRef>,
    pub created_at: DateTime<Utc>,
}

/// The single live role profile of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Librarian(LibrarianProfile),
    Patron(PatronProfile),
}

impl Role {
    /// Fresh, empty profile of the given kind
    pub fn fresh(kind: RoleKind, user_id: Uuid, now: DateTime<Utc>) -> Self {
        match kind {
            RoleKind::Librarian => Role::Librarian(LibrarianProfile {
                user_id,
                created_at: now,
            }),
            RoleKind::Patron => Role::Patron(PatronProfile {
                user_id,
                display_name: None,
                image: None,
                created_at: now,
            }),
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Librarian(_) => RoleKind::Librarian,
            Role::Patron(_) => RoleKind::Patron,
        }
    }

    /// Page a freshly logged-in user lands on
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Librarian(_) => "/lending/librarian/page/",
            Role::Patron(_) => "/lending/patron/page/",
        }
    }

    pub fn as_patron(&self) -> Option<&PatronProfile> {
        match self {
            Role::Patron(profile) => Some(profile),
            Role::Librarian(_) => None,
        }
    }
}

/// Result of a role assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Unchanged,
    Swapped { from: RoleKind, to: RoleKind },
}

/// Result of a promotion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    Promoted,
    AlreadyLibrarian,
}

/// Full user model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

impl User {
    /// Replace the role profile when `kind` differs from the current one.
    /// The stale profile is dropped together with its attributes.
    pub fn set_role(&mut self, kind: RoleKind, now: DateTime<Utc>) -> RoleChange {
        let from = self.role.kind();
        if from == kind {
            return RoleChange::Unchanged;
        }
        self.role = Role::fresh(kind, self.id, now);
        RoleChange::Swapped { from, to: kind }
    }

    pub fn is_librarian(&self) -> bool {
        matches!(self.role, Role::Librarian(_))
    }

    pub fn viewer(&self) -> Viewer {
        match self.role {
            Role::Librarian(_) => Viewer::Librarian(self.id),
            Role::Patron(_) => Viewer::Patron(self.id),
        }
    }
}

/// Internal row structure joining users with both profile tables
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    role: RoleKind,
    created_at: DateTime<Utc>,
    librarian_since: Option<DateTime<Utc>>,
    patron_since: Option<DateTime<Utc>>,
    display_name: Option<String>,
    image_url: Option<String>,
    image_key: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = match row.role {
            RoleKind::Librarian => Role::Librarian(LibrarianProfile {
                user_id: row.id,
                created_at: row.librarian_since.unwrap_or(row.created_at),
            }),
            RoleKind::Patron => Role::Patron(PatronProfile {
                user_id: row.id,
                display_name: row.display_name,
                image: ImageRef::from_columns(row.image_url, row.image_key),
                created_at: row.patron_since.unwrap_or(row.created_at),
            }),
        };

        User {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            role,
        }
    }
}

/// Current user as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: RoleKind,
    pub display_name: Option<String>,
    /// Profile image (patrons only); the placeholder when nothing was uploaded
    pub image_url: Option<String>,
    pub landing_path: String,
}

impl UserInfo {
    pub fn new(user: &User, image_url: Option<String>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.kind(),
            display_name: user.role.as_patron().and_then(|p| p.display_name.clone()),
            image_url,
            landing_path: user.role.landing_path().to_string(),
        }
    }
}

/// Data needed to register a user seen for the first time
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Promote a patron to librarian
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PromoteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Update own patron profile
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePatronProfile {
    /// Display name override; empty clears it, omitted leaves it as is
    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    pub display_name: Option<String>,
}

impl UpdatePatronProfile {
    /// `None` when the display name is untouched, `Some(None)` to clear it
    pub fn display_name_change(&self) -> Option<Option<&str>> {
        self.display_name
            .as_deref()
            .map(|name| Some(name.trim()).filter(|name| !name.is_empty()))
    }
}

/// Claims of the JWT issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl IdentityClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Registration data for a user first seen with these claims
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            username: self.email.clone(),
            email: self.email.clone(),
            first_name: self.given_name.clone().unwrap_or_default(),
            last_name: self.family_name.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_change() {
        let parse = |body: serde_json::Value| -> UpdatePatronProfile { serde_json::from_value(body).unwrap() };

        assert_eq!(parse(serde_json::json!({})).display_name_change(), None);
        assert_eq!(
            parse(serde_json::json!({ "display_name": "" })).display_name_change(),
            Some(None)
        );
        assert_eq!(
            parse(serde_json::json!({ "display_name": "  Ada  " })).display_name_change(),
            Some(Some("Ada"))
        );
    }

    fn patron(now: DateTime<Utc>) -> User {
        let id = Uuid::new_v4();
        User {
            id,
            username: "ada@example.com".into(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            created_at: now,
            role: Role::Patron(PatronProfile {
                user_id: id,
                display_name: Some("ada".into()),
                image: None,
                created_at: now,
            }),
        }
    }

    #[test]
    fn test_promotion_swaps_profile() {
        let now = Utc::now();
        let mut user = patron(now);

        let change = user.set_role(RoleKind::Librarian, now);

        assert_eq!(
            change,
            RoleChange::Swapped {
                from: RoleKind::Patron,
                to: RoleKind::Librarian
            }
        );
        assert_eq!(user.role.kind(), RoleKind::Librarian);
        assert!(user.role.as_patron().is_none());
        assert_eq!(user.viewer(), Viewer::Librarian(user.id));
    }

    #[test]
    fn test_same_role_keeps_profile() {
        let now = Utc::now();
        let mut user = patron(now);
        let before = user.role.clone();

        assert_eq!(user.set_role(RoleKind::Patron, now), RoleChange::Unchanged);
        assert_eq!(user.role, before);
    }

    #[test]
    fn test_demotion_starts_from_empty_patron_profile() {
        let now = Utc::now();
        let mut user = patron(now);
        user.set_role(RoleKind::Librarian, now);
        user.set_role(RoleKind::Patron, now);

        let profile = user.role.as_patron().unwrap();
        assert_eq!(profile.display_name, None);
        assert_eq!(profile.image, None);
    }

    #[test]
    fn test_landing_path_by_role() {
        let now = Utc::now();
        let mut user = patron(now);
        assert_eq!(user.role.landing_path(), "/lending/patron/page/");
        user.set_role(RoleKind::Librarian, now);
        assert_eq!(user.role.landing_path(), "/lending/librarian/page/");
    }

    #[test]
    fn test_token_round_trip() {
        let now = Utc::now().timestamp();
        let claims = IdentityClaims {
            sub: "google|42".into(),
            email: "ada@example.com".into(),
            given_name: Some("Ada".into()),
            family_name: None,
            exp: now + 3600,
            iat: now,
        };
        let token = claims.create_token("secret").unwrap();

        let parsed = IdentityClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.email, "ada@example.com");
        assert!(IdentityClaims::from_token(&token, "other").is_err());

        let new_user = parsed.to_new_user();
        assert_eq!(new_user.username, "ada@example.com");
        assert_eq!(new_user.first_name, "Ada");
        assert_eq!(new_user.last_name, "");
    }
}
