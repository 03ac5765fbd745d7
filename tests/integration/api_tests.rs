//! API integration tests
//!
//! Run against a server started with `RUN_MODE=test` (see `config/test.toml`):
//! `cargo test -- --ignored`

use chrono::Utc;
use reqwest::{multipart, Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;
use wardrobe_server::models::user::IdentityClaims;

const BASE_URL: &str = "http://localhost:8080/api/v1";
const JWT_SECRET: &str = "wardrobe-integration-secret";
const LIBRARIAN_EMAIL: &str = "librarian@wardrobe.test";

/// Token the identity provider would issue for `email`
fn token_for(email: &str) -> String {
    let now = Utc::now().timestamp();
    IdentityClaims {
        sub: format!("test|{}", email),
        email: email.to_string(),
        given_name: Some("Test".to_string()),
        family_name: None,
        exp: now + 3600,
        iat: now,
    }
    .create_token(JWT_SECRET)
    .expect("Failed to sign token")
}

fn new_patron_token() -> String {
    token_for(&format!("patron-{}@wardrobe.test", Uuid::new_v4()))
}

async fn me(client: &Client, token: &str) -> Value {
    client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response")
}

async fn create_item(client: &Client, token: &str, body: Value) -> Value {
    let form = multipart::Form::new().text("data", body.to_string());
    let response = client
        .post(format!("{}/items", BASE_URL))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

async fn create_collection(client: &Client, token: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/collections", BASE_URL))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

async fn manage_lending(client: &Client, token: &str, id: &str, action: &str) -> reqwest::Response {
    client
        .post(format!("{}/lendings/{}/manage", BASE_URL, id))
        .bearer_auth(token)
        .json(&json!({ "action": action }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_first_sight_registers_patron() {
    let client = Client::new();
    let email = format!("newcomer-{}@wardrobe.test", Uuid::new_v4());

    let body = me(&client, &token_for(&email)).await;

    assert_eq!(body["role"], "patron");
    assert_eq!(body["username"], email);
    assert_eq!(body["landing_path"], "/lending/patron/page/");
    assert!(body["image_url"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_missing_or_bad_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_promotion() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let email = format!("promoted-{}@wardrobe.test", Uuid::new_v4());
    let patron = token_for(&email);
    me(&client, &patron).await;

    // Patrons cannot promote
    let response = client
        .post(format!("{}/users/promote", BASE_URL))
        .bearer_auth(&patron)
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/users/promote", BASE_URL))
        .bearer_auth(&librarian)
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["outcome"], "promoted");
    assert_eq!(me(&client, &patron).await["role"], "librarian");

    let response = client
        .post(format!("{}/users/promote", BASE_URL))
        .bearer_auth(&librarian)
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["outcome"], "already_librarian");

    let response = client
        .post(format!("{}/users/promote", BASE_URL))
        .bearer_auth(&librarian)
        .json(&json!({ "email": "nobody@wardrobe.test" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_lending_lifecycle() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let patron = new_patron_token();
    me(&client, &librarian).await;

    let created = create_item(
        &client,
        &librarian,
        json!({
            "name": "Black Formal Suit",
            "size": "m",
            "condition": "like_new",
            "new_category": "Formal"
        }),
    )
    .await;
    assert!(created["warnings"].as_array().unwrap().is_empty());
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let lending: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(lending["status"], "pending");
    let lending_id = lending["id"].as_str().unwrap().to_string();

    // A second request on the same pending item conflicts
    let response = client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = manage_lending(&client, &librarian, &lending_id, "approve").await;
    assert!(response.status().is_success());
    let approved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(approved["status"], "approved");

    let approved_date: chrono::DateTime<Utc> =
        serde_json::from_value(approved["approved_date"].clone()).unwrap();
    let due_date: chrono::DateTime<Utc> = serde_json::from_value(approved["due_date"].clone()).unwrap();
    assert_eq!(due_date - approved_date, chrono::Duration::days(14));

    // Approving again is refused
    let response = manage_lending(&client, &librarian, &lending_id, "approve").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .post(format!("{}/lendings/{}/request-return", BASE_URL, lending_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["return_requested"], true);

    let response = manage_lending(&client, &librarian, &lending_id, "return").await;
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["status"], "returned");

    let item: Value = client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(item["item"]["available"], true);
    assert_eq!(item["categories"][0]["name"], "Formal");
}

#[tokio::test]
#[ignore]
async fn test_rejected_request_frees_item() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let patron = new_patron_token();

    let created = create_item(
        &client,
        &librarian,
        json!({ "name": "Red Wool Scarf", "size": "s", "condition": "good" }),
    )
    .await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let lending: Value = client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let lending_id = lending["id"].as_str().unwrap().to_string();

    // Only the owning librarian decides
    let other = token_for(&format!("other-{}@wardrobe.test", Uuid::new_v4()));
    let response = manage_lending(&client, &other, &lending_id, "reject").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = manage_lending(&client, &librarian, &lending_id, "reject").await;
    let rejected: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(rejected["status"], "rejected");

    let response = client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn test_private_collection_and_invites() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let patron = new_patron_token();
    let patron_id = me(&client, &patron).await["id"].as_str().unwrap().to_string();

    let collection = create_collection(
        &client,
        &librarian,
        json!({ "name": format!("Gala {}", Uuid::new_v4()), "is_private": true }),
    )
    .await;
    let collection_id = collection["collection"]["id"].as_str().unwrap().to_string();

    let created = create_item(
        &client,
        &librarian,
        json!({
            "name": "Sequin Dress",
            "size": "s",
            "condition": "new",
            "collection_ids": [collection_id]
        }),
    )
    .await;
    assert_eq!(created["item"]["private_collection"], true);
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    // Hidden from guests and from patrons outside the allow-list
    let response = client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let browse: Value = client
        .get(format!("{}/browse", BASE_URL))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let restricted = browse["restricted_collections"].as_array().unwrap();
    assert!(restricted.iter().any(|c| c["id"] == collection_id.as_str()));

    let response = client
        .post(format!("{}/collections/{}/invites", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let invite: Value = response.json().await.expect("Failed to parse response");
    let invite_id = invite["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/invites/{}/manage", BASE_URL, invite_id))
        .bearer_auth(&librarian)
        .json(&json!({ "action": "approve" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let details: Value = client
        .get(format!("{}/collections/{}", BASE_URL, collection_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let allowed = details["allowed_patrons"].as_array().unwrap();
    assert!(allowed.iter().any(|p| p == patron_id.as_str()));

    // Re-requesting after approval conflicts
    let response = client
        .post(format!("{}/collections/{}/invites", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_private_membership_is_exclusive() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);

    let private = create_collection(
        &client,
        &librarian,
        json!({ "name": format!("Vault {}", Uuid::new_v4()), "is_private": true }),
    )
    .await;
    let public = create_collection(
        &client,
        &librarian,
        json!({ "name": format!("Daywear {}", Uuid::new_v4()) }),
    )
    .await;
    let private_id = private["collection"]["id"].as_str().unwrap().to_string();
    let public_id = public["collection"]["id"].as_str().unwrap().to_string();

    let created = create_item(
        &client,
        &librarian,
        json!({ "name": "Velvet Blazer", "size": "l", "condition": "fair" }),
    )
    .await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/items/{}/collections", BASE_URL, item_id))
        .bearer_auth(&librarian)
        .json(&json!({ "collection_ids": [private_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let details: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(details["item"]["private_collection"], true);

    let response = client
        .post(format!("{}/items/{}/collections", BASE_URL, item_id))
        .bearer_auth(&librarian)
        .json(&json!({ "collection_ids": [public_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Leaving the private collection clears the flag
    let response = client
        .delete(format!("{}/collections/{}/items/{}", BASE_URL, private_id, item_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let item: Value = client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(item["item"]["private_collection"], false);
}

#[tokio::test]
#[ignore]
async fn test_rating_once_per_patron() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let patron = new_patron_token();

    let created = create_item(
        &client,
        &librarian,
        json!({ "name": "Linen Shirt", "size": "xl", "condition": "worn" }),
    )
    .await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let rate = |score: i64| {
        client
            .post(format!("{}/items/{}/ratings", BASE_URL, item_id))
            .bearer_auth(&patron)
            .json(&json!({ "num_rating": score, "comment": "Fits well" }))
            .send()
    };

    let response = rate(4).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let rating: Value = response.json().await.expect("Failed to parse response");

    let response = rate(5).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = rate(9).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Someone else cannot edit it
    let response = client
        .put(format!("{}/ratings/{}", BASE_URL, rating["id"].as_str().unwrap()))
        .bearer_auth(new_patron_token())
        .json(&json!({ "num_rating": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let ratings: Value = client
        .get(format!("{}/items/{}/ratings", BASE_URL, item_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(ratings["average"], 4.0);
}

async fn get_item(client: &Client, token: &str, item_id: &str) -> Value {
    client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response")
}

async fn borrow(client: &Client, token: &str, item_id: &str) -> reqwest::Response {
    client
        .post(format!("{}/items/{}/borrow", BASE_URL, item_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore]
async fn test_other_patron_cannot_borrow_pending_item() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let first = new_patron_token();
    let second = new_patron_token();

    let created = create_item(
        &client,
        &librarian,
        json!({ "name": "Camel Trench Coat", "size": "m", "condition": "good" }),
    )
    .await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let response = borrow(&client, &first, &item_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let lending: Value = response.json().await.expect("Failed to parse response");

    let response = borrow(&client, &second, &item_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mine: Value = client
        .get(format!("{}/lendings/mine", BASE_URL))
        .bearer_auth(&first)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["lending"]["id"], lending["id"]);
    assert_eq!(mine[0]["lending"]["status"], "pending");

    let item = get_item(&client, &librarian, &item_id).await;
    assert_eq!(item["item"]["available"], false);
}

#[tokio::test]
#[ignore]
async fn test_availability_cannot_be_edited_during_loan() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);
    let first = new_patron_token();
    let second = new_patron_token();

    let created = create_item(
        &client,
        &librarian,
        json!({ "name": "Denim Jacket", "size": "l", "condition": "good" }),
    )
    .await;
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let lending: Value = borrow(&client, &first, &item_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let response = manage_lending(&client, &librarian, lending["id"].as_str().unwrap(), "approve").await;
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(&librarian)
        .json(&json!({ "available": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Other fields stay editable
    let response = client
        .put(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(&librarian)
        .json(&json!({ "description": "Stonewashed" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = borrow(&client, &second, &item_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_privacy_flag_follows_collection_changes() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);

    let collection = create_collection(
        &client,
        &librarian,
        json!({ "name": format!("Knitwear {}", Uuid::new_v4()) }),
    )
    .await;
    let collection_id = collection["collection"]["id"].as_str().unwrap().to_string();

    let created = create_item(
        &client,
        &librarian,
        json!({
            "name": "Cable Knit Sweater",
            "size": "m",
            "condition": "good",
            "collection_ids": [collection_id]
        }),
    )
    .await;
    assert_eq!(created["item"]["private_collection"], false);
    let item_id = created["item"]["id"].as_str().unwrap().to_string();

    let set_private = |is_private: bool| {
        client
            .put(format!("{}/collections/{}", BASE_URL, collection_id))
            .bearer_auth(&librarian)
            .json(&json!({ "is_private": is_private }))
            .send()
    };

    let response = set_private(true).await.expect("Failed to send request");
    assert!(response.status().is_success());
    assert_eq!(get_item(&client, &librarian, &item_id).await["item"]["private_collection"], true);

    let response = set_private(false).await.expect("Failed to send request");
    assert!(response.status().is_success());
    assert_eq!(get_item(&client, &librarian, &item_id).await["item"]["private_collection"], false);

    set_private(true).await.expect("Failed to send request");
    let response = client
        .delete(format!("{}/collections/{}", BASE_URL, collection_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let item = get_item(&client, &librarian, &item_id).await;
    assert_eq!(item["item"]["private_collection"], false);
    assert!(item["collections"].as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_concurrent_privacy_flip_keeps_exclusivity() {
    let client = Client::new();
    let librarian = token_for(LIBRARIAN_EMAIL);

    for round in 0..5 {
        let home = create_collection(
            &client,
            &librarian,
            json!({ "name": format!("Home {} {}", round, Uuid::new_v4()) }),
        )
        .await;
        let other = create_collection(
            &client,
            &librarian,
            json!({ "name": format!("Other {} {}", round, Uuid::new_v4()) }),
        )
        .await;
        let home_id = home["collection"]["id"].as_str().unwrap().to_string();
        let other_id = other["collection"]["id"].as_str().unwrap().to_string();

        let created = create_item(
            &client,
            &librarian,
            json!({
                "name": "Silk Tie",
                "size": "s",
                "condition": "new",
                "collection_ids": [home_id]
            }),
        )
        .await;
        let item_id = created["item"]["id"].as_str().unwrap().to_string();

        let add = client
            .post(format!("{}/items/{}/collections", BASE_URL, item_id))
            .bearer_auth(&librarian)
            .json(&json!({ "collection_ids": [other_id] }))
            .send();
        let flip = client
            .put(format!("{}/collections/{}", BASE_URL, home_id))
            .bearer_auth(&librarian)
            .json(&json!({ "is_private": true }))
            .send();
        let (add, flip) = tokio::join!(add, flip);
        let (add, flip) = (add.expect("Failed to send request"), flip.expect("Failed to send request"));

        // Exactly one of the two wins
        assert!(add.status().is_success() != flip.status().is_success());

        let item = get_item(&client, &librarian, &item_id).await;
        let collections = item["collections"].as_array().unwrap();
        let any_private = collections.iter().any(|c| c["is_private"] == true);
        if any_private {
            assert_eq!(collections.len(), 1);
        }
        assert_eq!(item["item"]["private_collection"], any_private);
    }
}

#[tokio::test]
#[ignore]
async fn test_profile_update_keeps_omitted_display_name() {
    let client = Client::new();
    let patron = new_patron_token();

    let update = |body: Value| {
        client
            .put(format!("{}/patrons/me", BASE_URL))
            .bearer_auth(&patron)
            .json(&body)
            .send()
    };

    let body: Value = update(json!({ "display_name": "Ada" }))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["display_name"], "Ada");

    let body: Value = update(json!({}))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["display_name"], "Ada");

    let body: Value = update(json!({ "display_name": "" }))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(body["display_name"].is_null());
}
