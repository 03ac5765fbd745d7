//! Collection model and membership rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::item::ItemShort;
use crate::error::{AppError, AppResult};

/// Collection with its allow-list
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub is_private: bool,
    /// Only meaningful while `is_private` is set
    pub allowed_patrons: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn is_allowed(&self, patron_id: Uuid) -> bool {
        self.allowed_patrons.contains(&patron_id)
    }

    pub fn membership(&self) -> MembershipRef {
        MembershipRef {
            collection_id: self.id,
            is_private: self.is_private,
        }
    }
}

/// Collection as listed to viewers (the allow-list stays hidden)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionShort {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub is_private: bool,
}

impl From<&Collection> for CollectionShort {
    fn from(c: &Collection) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            description: c.description.clone(),
            created_by: c.created_by,
            is_private: c.is_private,
        }
    }
}

/// Collection page: the collection, its visible items and, for those who may
/// edit it, the allow-list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionDetails {
    pub collection: CollectionShort,
    pub items: Vec<ItemShort>,
    pub allowed_patrons: Option<Vec<Uuid>>,
    pub can_edit: bool,
}

/// Create collection request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCollection {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub allowed_patrons: Vec<Uuid>,
}

/// Update collection request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCollection {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    /// Replaces the allow-list when present
    pub allowed_patrons: Option<Vec<Uuid>>,
}

/// Add an item to collections
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCollections {
    pub collection_ids: Vec<Uuid>,
}

/// One membership of an item, as seen by the exclusivity rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipRef {
    pub collection_id: Uuid,
    pub is_private: bool,
}

/// Check that adding `targets` to an item currently in `current` keeps privacy
/// exclusive: a private collection must be the only collection of its items.
/// Returns the collections the item is not yet a member of.
pub fn check_membership_add(
    current: &[MembershipRef],
    targets: &[MembershipRef],
) -> AppResult<Vec<Uuid>> {
    let mut added: Vec<MembershipRef> = Vec::new();
    for target in targets {
        let known = current.iter().chain(added.iter()).any(|m| m.collection_id == target.collection_id);
        if !known {
            added.push(*target);
        }
    }

    if added.is_empty() {
        return Ok(Vec::new());
    }

    if current.iter().any(|m| m.is_private) {
        return Err(AppError::Validation(
            "Item is in a private collection and cannot be added to another collection".to_string(),
        ));
    }

    let total = current.len() + added.len();
    if added.iter().any(|m| m.is_private) && total > 1 {
        let message = if current.is_empty() {
            "A private collection must be the only collection of its items"
        } else {
            "Item already belongs to a collection and cannot be added to a private collection"
        };
        return Err(AppError::Validation(message.to_string()));
    }

    Ok(added.into_iter().map(|m| m.collection_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(is_private: bool) -> MembershipRef {
        MembershipRef {
            collection_id: Uuid::new_v4(),
            is_private,
        }
    }

    #[test]
    fn test_free_item_joins_private_collection() {
        let private = membership(true);
        assert_eq!(check_membership_add(&[], &[private]).unwrap(), vec![private.collection_id]);
    }

    #[test]
    fn test_private_member_cannot_join_public_collection() {
        let private = membership(true);
        let public = membership(false);
        assert!(matches!(
            check_membership_add(&[private], &[public]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_public_member_cannot_join_private_collection() {
        let public = membership(false);
        let private = membership(true);
        assert!(matches!(
            check_membership_add(&[public], &[private]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_private_target_must_be_alone() {
        assert!(check_membership_add(&[], &[membership(true), membership(false)]).is_err());
    }

    #[test]
    fn test_public_collections_accumulate() {
        let a = membership(false);
        let b = membership(false);
        let c = membership(false);
        let added = check_membership_add(&[a], &[b, c]).unwrap();
        assert_eq!(added, vec![b.collection_id, c.collection_id]);
    }

    #[test]
    fn test_existing_membership_is_a_no_op() {
        let private = membership(true);
        assert!(check_membership_add(&[private], &[private]).unwrap().is_empty());
        assert!(check_membership_add(&[], &[private, private]).unwrap().len() == 1);
    }

    #[test]
    fn test_allow_list() {
        let patron = Uuid::new_v4();
        let collection = Collection {
            id: Uuid::new_v4(),
            name: "Gala".into(),
            description: String::new(),
            created_by: Uuid::new_v4(),
            is_private: true,
            allowed_patrons: vec![patron],
            created_at: Utc::now(),
        };
        assert!(collection.is_allowed(patron));
        assert!(!collection.is_allowed(Uuid::new_v4()));
        assert!(collection.membership().is_private);
    }
}
