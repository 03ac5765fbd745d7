//! Catalog service: collections, items and categories as seen by a viewer

use std::collections::HashMap;

use uuid::Uuid;
use validator::Validate;

use super::{
    browse::item_visible,
    media::{MediaService, ITEM_IMAGES},
};
use crate::{
    access::{self, Viewer},
    error::{AppError, AppResult},
    models::{
        collection::{CollectionDetails, CreateCollection, UpdateCollection},
        item::{CreateItem, ItemDetails, ItemSnapshot, ItemWithWarnings, UpdateItem},
        Category, Collection, CollectionShort, Item, ItemShort,
    },
    repository::Repository,
    storage::Upload,
};

/// Load an item the viewer is allowed to see, with the collections holding it.
/// Hidden items read as missing.
pub(crate) async fn visible_item(
    repository: &Repository,
    viewer: &Viewer,
    id: Uuid,
) -> AppResult<(Item, Vec<Collection>)> {
    let item = repository.items.get_by_id(id).await?;
    let collections = repository.collections.list_for_item(id).await?;
    if !access::can_view_item(viewer, &collections) {
        return Err(AppError::NotFound(format!("Item with id {} not found", id)));
    }
    Ok((item, collections))
}

/// List representation of items, with fresh image links
pub(crate) async fn present_items<'a, I>(media: &MediaService, snapshots: I) -> Vec<ItemShort>
where
    I: IntoIterator<Item = &'a ItemSnapshot>,
{
    let mut items = Vec::new();
    for snapshot in snapshots {
        let image_url = media.optional_link(snapshot.item.image.as_ref()).await;
        items.push(ItemShort::new(
            &snapshot.item,
            snapshot.category_names.clone(),
            image_url,
        ));
    }
    items
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    media: MediaService,
}

impl CatalogService {
    pub fn new(repository: Repository, media: MediaService) -> Self {
        Self { repository, media }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    // =========================================================================
    // COLLECTIONS
    // =========================================================================

    pub async fn create_collection(&self, viewer: &Viewer, data: CreateCollection) -> AppResult<CollectionDetails> {
        if !access::can_add_collection(viewer) {
            return Err(AppError::Authentication("Login required".to_string()));
        }
        data.validate()?;

        let collection = self.repository.collections.create(&data, viewer).await?;
        tracing::info!(
            collection_id = %collection.id,
            is_private = collection.is_private,
            "Collection created"
        );
        self.collection_details(viewer, collection).await
    }

    /// Collection page. Private collections the viewer may not see read as missing.
    pub async fn get_collection(&self, viewer: &Viewer, id: Uuid) -> AppResult<CollectionDetails> {
        let collection = self.repository.collections.get_by_id(id).await?;
        if !access::can_view_collection(viewer, &collection) {
            return Err(AppError::NotFound(format!("Collection with id {} not found", id)));
        }
        self.collection_details(viewer, collection).await
    }

    pub async fn update_collection(
        &self,
        viewer: &Viewer,
        id: Uuid,
        data: UpdateCollection,
    ) -> AppResult<CollectionDetails> {
        viewer.require_authenticated()?;
        data.validate()?;
        let collection = self.repository.collections.update(id, &data, viewer).await?;
        self.collection_details(viewer, collection).await
    }

    pub async fn delete_collection(&self, viewer: &Viewer, id: Uuid) -> AppResult<()> {
        viewer.require_authenticated()?;
        self.repository.collections.delete(id, viewer).await?;
        tracing::info!(collection_id = %id, "Collection deleted");
        Ok(())
    }

    pub async fn remove_item_from_collection(&self, viewer: &Viewer, collection_id: Uuid, item_id: Uuid) -> AppResult<()> {
        viewer.require_authenticated()?;
        self.repository
            .collections
            .remove_item(collection_id, item_id, viewer)
            .await
    }

    pub async fn remove_patron_access(&self, viewer: &Viewer, collection_id: Uuid, patron_id: Uuid) -> AppResult<()> {
        viewer.require_authenticated()?;
        self.repository
            .collections
            .remove_patron(collection_id, patron_id, viewer)
            .await?;
        tracing::info!(collection_id = %collection_id, patron_id = %patron_id, "Patron access removed");
        Ok(())
    }

    async fn collection_details(&self, viewer: &Viewer, collection: Collection) -> AppResult<CollectionDetails> {
        let snapshots = self.repository.items.list_in_collection(collection.id).await?;
        let all = self.repository.collections.list_all().await?;
        let by_id: HashMap<Uuid, &Collection> = all.iter().map(|c| (c.id, c)).collect();

        let visible: Vec<&ItemSnapshot> = snapshots
            .iter()
            .filter(|s| item_visible(viewer, s, &by_id))
            .collect();
        let items = present_items(&self.media, visible).await;

        let can_edit = access::can_modify_collection(viewer, &collection);
        Ok(CollectionDetails {
            collection: CollectionShort::from(&collection),
            items,
            allowed_patrons: can_edit.then(|| collection.allowed_patrons.clone()),
            can_edit,
        })
    }

    // =========================================================================
    // ITEMS
    // =========================================================================

    /// Catalog a new item. The picture is optional and its upload failing does
    /// not prevent the item from being saved.
    pub async fn create_item(
        &self,
        viewer: &Viewer,
        data: CreateItem,
        image: Option<Upload>,
    ) -> AppResult<ItemWithWarnings> {
        let librarian_id = viewer.require_librarian()?;
        data.validate()?;
        if let Some(upload) = &image {
            self.media.check(upload)?;
        }

        let mut item = self.repository.items.create(&data, viewer, librarian_id).await?;
        tracing::info!(item_id = %item.id, name = %item.name, "Item created");

        let mut warnings = Vec::new();
        if let Some(upload) = image {
            if let Some(uploaded) = self.media.upload_or_warn(ITEM_IMAGES, upload, &mut warnings).await? {
                match self.repository.items.set_image(item.id, Some(&uploaded)).await {
                    Ok((updated, _)) => item = updated,
                    Err(e) => {
                        tracing::warn!(item_id = %item.id, error = %e, "Cannot attach uploaded image");
                        warnings.push("Image was uploaded but could not be attached".to_string());
                        self.media.discard(Some(uploaded)).await;
                    }
                }
            }
        }

        self.media.refresh(&mut item.image).await;
        Ok(ItemWithWarnings { item, warnings })
    }

    /// Item page. Items in a collection the viewer may not see read as missing.
    pub async fn get_item(&self, viewer: &Viewer, id: Uuid) -> AppResult<ItemDetails> {
        let (mut item, collections) = visible_item(&self.repository, viewer, id).await?;
        self.media.refresh(&mut item.image).await;
        let categories = self.repository.categories.for_item(id).await?;
        let average_rating = self.repository.ratings.average_for_item(id).await?;

        Ok(ItemDetails {
            item,
            categories,
            collections: collections.iter().map(CollectionShort::from).collect(),
            average_rating,
        })
    }

    pub async fn update_item(&self, viewer: &Viewer, id: Uuid, data: UpdateItem) -> AppResult<Item> {
        if !access::can_manage_catalog(viewer) {
            return Err(AppError::Authorization("Librarian privileges required".to_string()));
        }
        data.validate()?;

        let mut item = self.repository.items.update(id, &data).await?;
        self.media.refresh(&mut item.image).await;
        Ok(item)
    }

    pub async fn delete_item(&self, viewer: &Viewer, id: Uuid) -> AppResult<()> {
        if !access::can_manage_catalog(viewer) {
            return Err(AppError::Authorization("Librarian privileges required".to_string()));
        }
        let item = self.repository.items.delete(id).await?;
        tracing::info!(item_id = %id, "Item deleted");
        self.media.discard(item.image).await;
        Ok(())
    }

    /// Replace the item picture. Here the upload is the whole operation, so a
    /// storage failure is reported to the caller.
    pub async fn set_item_image(&self, viewer: &Viewer, id: Uuid, upload: Upload) -> AppResult<Item> {
        if !access::can_manage_catalog(viewer) {
            return Err(AppError::Authorization("Librarian privileges required".to_string()));
        }
        self.repository.items.get_by_id(id).await?;

        let uploaded = self.media.upload(ITEM_IMAGES, upload).await?;
        let (mut item, previous) = match self.repository.items.set_image(id, Some(&uploaded)).await {
            Ok(result) => result,
            Err(e) => {
                self.media.discard(Some(uploaded)).await;
                return Err(e);
            }
        };
        self.media.discard(previous).await;
        self.media.refresh(&mut item.image).await;
        Ok(item)
    }

    pub async fn add_item_to_collections(
        &self,
        viewer: &Viewer,
        id: Uuid,
        collection_ids: &[Uuid],
    ) -> AppResult<ItemDetails> {
        viewer.require_authenticated()?;
        if collection_ids.is_empty() {
            return Err(AppError::Validation("No collection given".to_string()));
        }
        self.repository
            .collections
            .add_item(id, collection_ids, viewer)
            .await?;
        self.get_item(viewer, id).await
    }
}
