//! Browse and search over the catalog

use std::collections::HashMap;

use uuid::Uuid;

use super::{catalog::present_items, media::MediaService};
use crate::{
    access::{self, Viewer},
    error::AppResult,
    models::{
        item::{BrowseResult, ItemSnapshot},
        Category, Collection, CollectionShort,
    },
    repository::Repository,
};

/// What a viewer gets to see out of the loaded catalog
#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub items: Vec<&'a ItemSnapshot>,
    pub collections: Vec<&'a Collection>,
    pub restricted_collections: Vec<&'a Collection>,
    pub categories: Vec<&'a Category>,
}

fn matches(name: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => name.to_lowercase().contains(needle),
        None => true,
    }
}

/// Whether every collection holding the item is visible. The cached privacy
/// flag short-circuits the common case of items only in public collections.
pub(crate) fn item_visible(
    viewer: &Viewer,
    snapshot: &ItemSnapshot,
    collections: &HashMap<Uuid, &Collection>,
) -> bool {
    if viewer.is_librarian() || !snapshot.item.private_collection {
        return true;
    }
    if matches!(viewer, Viewer::Guest) {
        return false;
    }
    access::can_view_item(
        viewer,
        snapshot
            .collection_ids
            .iter()
            .filter_map(|id| collections.get(id).copied()),
    )
}

/// Filter the catalog for a viewer and an optional search term.
///
/// Librarians see everything, whatever its availability. Patrons see the
/// collections they may view, the private ones they may not (to request an
/// invite), and available items they may view. Guests see public collections
/// and available items outside private collections.
pub fn select<'a>(
    viewer: &Viewer,
    query: Option<&str>,
    collections: &'a [Collection],
    items: &'a [ItemSnapshot],
    categories: &'a [Category],
) -> Selection<'a> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let needle = needle.as_deref();

    let by_id: HashMap<Uuid, &Collection> = collections.iter().map(|c| (c.id, c)).collect();
    let mut selection = Selection::default();

    for collection in collections.iter().filter(|c| matches(&c.name, needle)) {
        match viewer {
            Viewer::Librarian(_) => selection.collections.push(collection),
            Viewer::Patron(_) => {
                if access::can_view_collection(viewer, collection) {
                    selection.collections.push(collection);
                } else {
                    selection.restricted_collections.push(collection);
                }
            }
            Viewer::Guest => {
                if !collection.is_private {
                    selection.collections.push(collection);
                }
            }
        }
    }

    selection.items = items
        .iter()
        .filter(|s| viewer.is_librarian() || s.item.available)
        .filter(|s| item_visible(viewer, s, &by_id))
        .filter(|s| {
            matches(&s.item.name, needle)
                || s.category_names.iter().any(|name| matches(name, needle))
        })
        .collect();

    selection.categories = categories
        .iter()
        .filter(|c| matches(&c.name, needle))
        .collect();
    selection
        .categories
        .sort_by_key(|c| c.name.to_lowercase());

    selection
}

#[derive(Clone)]
pub struct BrowseService {
    repository: Repository,
    media: MediaService,
}

impl BrowseService {
    pub fn new(repository: Repository, media: MediaService) -> Self {
        Self { repository, media }
    }

    pub async fn browse(&self, viewer: &Viewer, query: Option<String>) -> AppResult<BrowseResult> {
        let collections = self.repository.collections.list_all().await?;
        let items = self.repository.items.list_snapshots().await?;
        let categories = self.repository.categories.list().await?;

        let selection = select(viewer, query.as_deref(), &collections, &items, &categories);
        tracing::debug!(
            query = ?query,
            items = selection.items.len(),
            collections = selection.collections.len(),
            "Browse"
        );

        Ok(BrowseResult {
            items: present_items(&self.media, selection.items).await,
            collections: selection.collections.into_iter().map(CollectionShort::from).collect(),
            restricted_collections: selection
                .restricted_collections
                .into_iter()
                .map(CollectionShort::from)
                .collect(),
            categories: selection.categories.into_iter().cloned().collect(),
            query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Item, Size};
    use chrono::Utc;

    struct Catalog {
        collections: Vec<Collection>,
        items: Vec<ItemSnapshot>,
        categories: Vec<Category>,
    }

    fn collection(name: &str, is_private: bool, allowed: Vec<Uuid>) -> Collection {
        Collection {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            created_by: Uuid::new_v4(),
            is_private,
            allowed_patrons: allowed,
            created_at: Utc::now(),
        }
    }

    fn item(name: &str, available: bool, categories: &[&str], holders: &[&Collection]) -> ItemSnapshot {
        let now = Utc::now();
        ItemSnapshot {
            item: Item {
                id: Uuid::new_v4(),
                name: name.into(),
                description: String::new(),
                size: Size::M,
                condition: Condition::Good,
                image: None,
                available,
                private_collection: holders.iter().any(|c| c.is_private),
                created_by: Uuid::new_v4(),
                created_at: now,
                modified_at: now,
            },
            category_names: categories.iter().map(|c| c.to_string()).collect(),
            collection_ids: holders.iter().map(|c| c.id).collect(),
        }
    }

    fn names(items: &[&ItemSnapshot]) -> Vec<String> {
        let mut names: Vec<String> = items.iter().map(|s| s.item.name.clone()).collect();
        names.sort();
        names
    }

    /// Public "Daywear", private "Gala" allowing `insider`, plus four items
    fn catalog(insider: Uuid) -> Catalog {
        let daywear = collection("Daywear", false, vec![]);
        let gala = collection("Gala", true, vec![insider]);
        let items = vec![
            item("Linen shirt", true, &["Summer"], &[&daywear]),
            item("Sequin dress", true, &["Evening"], &[&gala]),
            item("Wool coat", false, &["Winter"], &[&daywear]),
            item("Denim jacket", true, &[], &[]),
        ];
        Catalog {
            collections: vec![daywear, gala],
            items,
            categories: vec![
                Category { id: Uuid::new_v4(), name: "Winter".into() },
                Category { id: Uuid::new_v4(), name: "evening".into() },
                Category { id: Uuid::new_v4(), name: "Summer".into() },
            ],
        }
    }

    #[test]
    fn test_guest_sees_public_available_items() {
        let c = catalog(Uuid::new_v4());
        let s = select(&Viewer::Guest, None, &c.collections, &c.items, &c.categories);

        assert_eq!(names(&s.items), vec!["Denim jacket", "Linen shirt"]);
        assert_eq!(s.collections.len(), 1);
        assert_eq!(s.collections[0].name, "Daywear");
        assert!(s.restricted_collections.is_empty());
    }

    #[test]
    fn test_patron_outside_allow_list() {
        let c = catalog(Uuid::new_v4());
        let viewer = Viewer::Patron(Uuid::new_v4());
        let s = select(&viewer, None, &c.collections, &c.items, &c.categories);

        assert_eq!(names(&s.items), vec!["Denim jacket", "Linen shirt"]);
        assert_eq!(s.restricted_collections.len(), 1);
        assert_eq!(s.restricted_collections[0].name, "Gala");
    }

    #[test]
    fn test_allow_listed_patron_sees_private_items() {
        let insider = Uuid::new_v4();
        let c = catalog(insider);
        let s = select(&Viewer::Patron(insider), None, &c.collections, &c.items, &c.categories);

        assert_eq!(names(&s.items), vec!["Denim jacket", "Linen shirt", "Sequin dress"]);
        assert_eq!(s.collections.len(), 2);
        assert!(s.restricted_collections.is_empty());
    }

    #[test]
    fn test_librarian_sees_everything() {
        let c = catalog(Uuid::new_v4());
        let s = select(&Viewer::Librarian(Uuid::new_v4()), None, &c.collections, &c.items, &c.categories);

        assert_eq!(s.items.len(), 4);
        assert_eq!(s.collections.len(), 2);
        assert!(s.restricted_collections.is_empty());
    }

    #[test]
    fn test_query_matches_names_and_categories() {
        let c = catalog(Uuid::new_v4());
        let librarian = Viewer::Librarian(Uuid::new_v4());

        let s = select(&librarian, Some("  EVENING "), &c.collections, &c.items, &c.categories);
        assert_eq!(names(&s.items), vec!["Sequin dress"]);
        assert_eq!(s.categories.len(), 1);
        assert!(s.collections.is_empty());

        let s = select(&librarian, Some("day"), &c.collections, &c.items, &c.categories);
        assert_eq!(s.collections.len(), 1);
        assert!(s.items.is_empty());
    }

    #[test]
    fn test_categories_sorted_without_query() {
        let c = catalog(Uuid::new_v4());
        let s = select(&Viewer::Guest, Some(""), &c.collections, &c.items, &c.categories);
        let names: Vec<&str> = s.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["evening", "Summer", "Winter"]);
    }

    #[test]
    fn test_item_in_public_and_hidden_collection_stays_hidden() {
        let public = collection("Daywear", false, vec![]);
        let hidden = collection("Vault", true, vec![]);
        let shared = item("Silk scarf", true, &[], &[&public, &hidden]);
        let collections = vec![public, hidden];
        let items = vec![shared];

        let s = select(&Viewer::Patron(Uuid::new_v4()), None, &collections, &items, &[]);
        assert!(s.items.is_empty());
    }
}
