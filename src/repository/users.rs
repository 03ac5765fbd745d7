//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::RoleKind,
        image::{image_columns, ImageRef},
        user::{NewUser, RoleChange, User, UserRow},
    },
};

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.role, u.created_at,
           l.created_at AS librarian_since, p.created_at AS patron_since,
           p.display_name, p.image_url, p.image_key
    FROM users u
    LEFT JOIN librarians l ON l.user_id = u.id
    LEFT JOIN patrons p ON p.user_id = u.id
"#;

fn profile_table(kind: RoleKind) -> &'static str {
    match kind {
        RoleKind::Librarian => "librarians",
        RoleKind::Patron => "patrons",
    }
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE u.id = $1", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        Ok(row.into())
    }

    /// Get user by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE LOWER(u.email) = LOWER($1)",
            USER_SELECT
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Register a new patron. Concurrent registrations of the same email
    /// resolve to the row that won.
    pub async fn create(&self, new_user: &NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(RoleKind::Patron)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(id) = inserted {
            sqlx::query("INSERT INTO patrons (user_id, created_at) VALUES ($1, NOW())")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_by_email(&new_user.email)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Username {} is already taken", new_user.username)))
    }

    /// Move a user to `kind`, replacing the profile row in the same transaction
    pub async fn set_role(&self, id: Uuid, kind: RoleKind) -> AppResult<(User, RoleChange)> {
        let mut tx = self.pool.begin().await?;

        let mut user: User = sqlx::query_as::<_, UserRow>(&format!(
            "{} WHERE u.id = $1 FOR UPDATE OF u",
            USER_SELECT
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?
        .into();

        let change = user.set_role(kind, Utc::now());

        if let RoleChange::Swapped { from, to } = change {
            sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", profile_table(from)))
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(&format!(
                "INSERT INTO {} (user_id, created_at) VALUES ($1, NOW()) ON CONFLICT (user_id) DO NOTHING",
                profile_table(to)
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
                .bind(to)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let user = match change {
            RoleChange::Unchanged => user,
            RoleChange::Swapped { .. } => self.get_by_id(id).await?,
        };
        Ok((user, change))
    }

    /// Update the display name of a patron profile
    pub async fn update_patron_profile(&self, id: Uuid, display_name: Option<&str>) -> AppResult<User> {
        let result = sqlx::query("UPDATE patrons SET display_name = $1 WHERE user_id = $2")
            .bind(display_name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Patron profile for {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Replace the patron profile image, returning the previous one
    pub async fn set_patron_image(&self, id: Uuid, image: Option<&ImageRef>) -> AppResult<Option<ImageRef>> {
        let mut tx = self.pool.begin().await?;

        let (old_url, old_key): (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT image_url, image_key FROM patrons WHERE user_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Patron profile for {} not found", id)))?;

        let (url, key) = image_columns(image);
        sqlx::query("UPDATE patrons SET image_url = $1, image_key = $2 WHERE user_id = $3")
            .bind(url)
            .bind(key)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ImageRef::from_columns(old_url, old_key))
    }
}
