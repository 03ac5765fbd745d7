//! Rating model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Rating left by a patron on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rating {
    pub id: Uuid,
    pub item_id: Uuid,
    pub rater_id: Uuid,
    pub rate_date: DateTime<Utc>,
    /// 1 to 5
    pub num_rating: i16,
    pub comment: String,
}

impl Rating {
    /// Only the author may change or remove a rating
    pub fn require_author(&self, user_id: Uuid) -> AppResult<()> {
        if self.rater_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only the author can modify this rating".to_string(),
            ))
        }
    }
}

/// Create rating request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRating {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub num_rating: i16,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: String,
}

/// Update rating request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRating {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub num_rating: Option<i16>,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

/// Ratings of an item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemRatings {
    pub ratings: Vec<Rating>,
    pub average: Option<f64>,
}

impl ItemRatings {
    pub fn new(ratings: Vec<Rating>) -> Self {
        let average = average_rating(&ratings);
        Self { ratings, average }
    }
}

pub fn average_rating(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: i64 = ratings.iter().map(|r| r.num_rating as i64).sum();
    Some(total as f64 / ratings.len() as f64)
}
