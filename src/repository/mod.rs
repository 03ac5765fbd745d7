//! Repository layer for database operations

pub mod categories;
pub mod collections;
pub mod invites;
pub mod items;
pub mod lendings;
pub mod ratings;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub collections: collections::CollectionsRepository,
    pub items: items::ItemsRepository,
    pub categories: categories::CategoriesRepository,
    pub lendings: lendings::LendingsRepository,
    pub invites: invites::InvitesRepository,
    pub ratings: ratings::RatingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            collections: collections::CollectionsRepository::new(pool.clone()),
            items: items::ItemsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            lendings: lendings::LendingsRepository::new(pool.clone()),
            invites: invites::InvitesRepository::new(pool.clone()),
            ratings: ratings::RatingsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
