//! Data models for Wardrobe

pub mod category;
pub mod collection;
pub mod enums;
pub mod image;
pub mod invite;
pub mod item;
pub mod lending;
pub mod rating;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use collection::{Collection, CollectionShort};
pub use enums::{Condition, InviteStatus, LendingStatus, RoleKind, Size};
pub use image::ImageRef;
pub use invite::Invite;
pub use item::{Item, ItemShort};
pub use lending::Lending;
pub use rating::Rating;
pub use user::{Role, User};
