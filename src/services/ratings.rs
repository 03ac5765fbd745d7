//! Item ratings

use uuid::Uuid;
use validator::Validate;

use super::catalog::visible_item;
use crate::{
    access::Viewer,
    error::AppResult,
    models::{
        rating::{CreateRating, ItemRatings, UpdateRating},
        Rating,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct RatingsService {
    repository: Repository,
}

impl RatingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Rate an item the patron can see, once
    pub async fn rate(&self, viewer: &Viewer, item_id: Uuid, data: CreateRating) -> AppResult<Rating> {
        let patron_id = viewer.require_patron()?;
        data.validate()?;
        visible_item(&self.repository, viewer, item_id).await?;

        let rating = self.repository.ratings.create(item_id, patron_id, &data).await?;
        tracing::info!(rating_id = %rating.id, item_id = %item_id, score = rating.num_rating, "Item rated");
        Ok(rating)
    }

    pub async fn list(&self, viewer: &Viewer, item_id: Uuid) -> AppResult<ItemRatings> {
        visible_item(&self.repository, viewer, item_id).await?;
        let ratings = self.repository.ratings.list_for_item(item_id).await?;
        Ok(ItemRatings::new(ratings))
    }

    pub async fn update(&self, viewer: &Viewer, id: Uuid, data: UpdateRating) -> AppResult<Rating> {
        let user_id = viewer.require_authenticated()?;
        data.validate()?;
        self.repository.ratings.update(id, user_id, &data).await
    }

    pub async fn delete(&self, viewer: &Viewer, id: Uuid) -> AppResult<()> {
        let user_id = viewer.require_authenticated()?;
        self.repository.ratings.delete(id, user_id).await
    }
}
