//! Visibility and ownership rules
//!
//! Pure predicates deciding what a viewer may see or change. Callers translate
//! a `false` into a hidden record (`NotFound`) or a refusal (`Authorization`).

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Collection,
};

/// Who is looking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Guest,
    Librarian(Uuid),
    Patron(Uuid),
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Guest => None,
            Viewer::Librarian(id) | Viewer::Patron(id) => Some(*id),
        }
    }

    pub fn is_librarian(&self) -> bool {
        matches!(self, Viewer::Librarian(_))
    }

    pub fn require_authenticated(&self) -> AppResult<Uuid> {
        self.user_id()
            .ok_or_else(|| AppError::Authentication("Login required".to_string()))
    }

    pub fn require_librarian(&self) -> AppResult<Uuid> {
        match self {
            Viewer::Librarian(id) => Ok(*id),
            _ => Err(AppError::Authorization("Librarian privileges required".to_string())),
        }
    }

    pub fn require_patron(&self) -> AppResult<Uuid> {
        match self {
            Viewer::Patron(id) => Ok(*id),
            _ => Err(AppError::Authorization("Only patrons can do this".to_string())),
        }
    }
}

/// Public collections are visible to everyone, private ones to librarians and
/// allow-listed patrons
pub fn can_view_collection(viewer: &Viewer, collection: &Collection) -> bool {
    if !collection.is_private {
        return true;
    }
    match viewer {
        Viewer::Librarian(_) => true,
        Viewer::Patron(id) => collection.is_allowed(*id),
        Viewer::Guest => false,
    }
}

/// An item is visible only if every collection holding it is visible.
/// Items outside any collection are visible to everyone.
pub fn can_view_item<'a, I>(viewer: &Viewer, collections: I) -> bool
where
    I: IntoIterator<Item = &'a Collection>,
{
    collections
        .into_iter()
        .all(|collection| can_view_collection(viewer, collection))
}

/// Any librarian, or the patron who created the collection
pub fn can_modify_collection(viewer: &Viewer, collection: &Collection) -> bool {
    match viewer {
        Viewer::Librarian(_) => true,
        Viewer::Patron(id) => collection.created_by == *id,
        Viewer::Guest => false,
    }
}

pub fn can_add_collection(viewer: &Viewer) -> bool {
    viewer.user_id().is_some()
}

/// Create, edit and delete items
pub fn can_manage_catalog(viewer: &Viewer) -> bool {
    viewer.is_librarian()
}

/// Decide on requests concerning something `owner_id` created (lendings of
/// their items, invites to their collections)
pub fn can_manage_requests(viewer: &Viewer, owner_id: Uuid) -> bool {
    matches!(viewer, Viewer::Librarian(id) if *id == owner_id)
}
