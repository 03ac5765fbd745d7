//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, browse, collections, health, invites, items, lendings, media, ratings, users};

/// Registers the bearer token scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wardrobe API",
        version = "0.1.0",
        description = "Clothing lending library REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth & users
        auth::me,
        users::promote,
        users::update_my_profile,
        users::upload_my_image,
        users::delete_my_image,
        // Browse
        browse::browse,
        browse::list_categories,
        // Collections
        collections::create_collection,
        collections::get_collection,
        collections::update_collection,
        collections::delete_collection,
        collections::remove_item,
        collections::remove_patron,
        collections::request_invite,
        // Invites
        invites::my_invites,
        invites::invite_queue,
        invites::manage_invite,
        // Items
        items::create_item,
        items::get_item,
        items::update_item,
        items::delete_item,
        items::upload_item_image,
        items::add_to_collections,
        // Lendings
        lendings::request_borrow,
        lendings::my_lendings,
        lendings::lending_queue,
        lendings::manage_lending,
        lendings::request_return,
        // Ratings
        ratings::rate_item,
        ratings::list_ratings,
        ratings::update_rating,
        ratings::delete_rating,
        // Media
        media::get_media,
    ),
    components(
        schemas(
            // Users
            crate::models::user::UserInfo,
            crate::models::user::PromoteRequest,
            crate::models::user::PromotionOutcome,
            crate::models::user::UpdatePatronProfile,
            crate::models::enums::RoleKind,
            users::PromoteResponse,
            // Catalog
            crate::models::category::Category,
            crate::models::collection::CollectionShort,
            crate::models::collection::CollectionDetails,
            crate::models::collection::CreateCollection,
            crate::models::collection::UpdateCollection,
            crate::models::collection::AddToCollections,
            crate::models::item::Item,
            crate::models::item::ItemShort,
            crate::models::item::ItemDetails,
            crate::models::item::ItemWithWarnings,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::item::BrowseResult,
            crate::models::image::ImageRef,
            crate::models::enums::Size,
            crate::models::enums::Condition,
            // Lendings
            crate::models::lending::Lending,
            crate::models::lending::LendingDetails,
            crate::models::lending::LendingAction,
            crate::models::lending::ManageLending,
            crate::models::enums::LendingStatus,
            // Invites
            crate::models::invite::Invite,
            crate::models::invite::InviteDetails,
            crate::models::invite::InviteAction,
            crate::models::invite::ManageInvite,
            crate::models::enums::InviteStatus,
            // Ratings
            crate::models::rating::Rating,
            crate::models::rating::CreateRating,
            crate::models::rating::UpdateRating,
            crate::models::rating::ItemRatings,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Current identity"),
        (name = "users", description = "Roles and patron profiles"),
        (name = "browse", description = "Catalog browsing and search"),
        (name = "collections", description = "Collections and their allow-lists"),
        (name = "items", description = "Garment catalog"),
        (name = "lendings", description = "Borrow requests and loans"),
        (name = "invites", description = "Access requests to private collections"),
        (name = "ratings", description = "Item ratings"),
        (name = "media", description = "Signed image downloads")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
