//! Business logic services

pub mod browse;
pub mod catalog;
pub mod invites;
pub mod lendings;
pub mod media;
pub mod ratings;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use crate::{config::AppConfig, error::AppResult, repository::Repository, storage::ObjectStorage};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub browse: browse::BrowseService,
    pub lendings: lendings::LendingsService,
    pub invites: invites::InvitesService,
    pub ratings: ratings::RatingsService,
    pub media: media::MediaService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository and object store
    pub fn new(repository: Repository, storage: Arc<dyn ObjectStorage>, config: &AppConfig) -> Self {
        let media = media::MediaService::new(
            storage,
            Duration::from_secs(config.storage.presign_ttl_secs),
            config.storage.placeholder_avatar_url.clone(),
        );

        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone(), media.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), media.clone()),
            browse: browse::BrowseService::new(repository.clone(), media.clone()),
            lendings: lendings::LendingsService::new(repository.clone(), &config.lending),
            invites: invites::InvitesService::new(repository.clone()),
            ratings: ratings::RatingsService::new(repository.clone()),
            media,
            repository,
        }
    }

    /// Whether the database answers
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
