//! Storage context API integration tests.
//!
//! Run with: `cargo test -p orgstore-api --test context_test`

mod helpers;

use helpers::auth::{bearer, token_with_roles, ORG_CREATOR, SUPERUSER};
use helpers::{context_path, setup_test_app};
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["storage_backend"], "local");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&context_path("/"))
        .json(&json!({ "name": "acme" }))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], 40101);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&context_path("/"))
        .add_header("Authorization", "Bearer not-a-jwt")
        .json(&json!({ "name": "acme" }))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_create_organization_requires_create_role() {
    let app = setup_test_app().await;
    let token = token_with_roles(&["viewer"]);

    let response = app
        .client()
        .post(&context_path("/"))
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "name": "acme" }))
        .await;

    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert_eq!(body["status"], 403);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["errorCode"], 20031);
    assert_eq!(body["message"], "insufficient privilege");
    assert!(!app.storage_root().join("acme").exists());
}

#[tokio::test]
async fn test_organization_and_space_lifecycle() {
    let app = setup_test_app().await;
    let client = app.client();
    let creator = token_with_roles(&[ORG_CREATOR]);
    let lowercase_superuser = SUPERUSER.to_lowercase();
    let admin = token_with_roles(&[lowercase_superuser.as_str()]);

    let response = client
        .post(&context_path("/"))
        .add_header("Authorization", bearer(&creator))
        .json(&json!({ "name": "acme" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(app.storage_root().join("acme").join("loadingzone").is_dir());

    let response = client
        .post(&context_path("/acme/space/"))
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "reports", "confidentiality": "PUBLIC" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(app.storage_root().join("acme").join("reports").is_dir());

    let response = client
        .delete(&context_path("/acme/space/reports"))
        .add_header("Authorization", bearer(&admin))
        .await;
    assert_eq!(response.status_code(), 204);
    assert!(!app.storage_root().join("acme").join("reports").exists());

    let response = client
        .delete(&context_path("/acme"))
        .add_header("Authorization", bearer(&admin))
        .await;
    assert_eq!(response.status_code(), 204);
    assert!(!app.storage_root().join("acme").exists());
}

#[tokio::test]
async fn test_space_routes_require_superuser() {
    let app = setup_test_app().await;
    let creator = token_with_roles(&[ORG_CREATOR]);

    let response = app
        .client()
        .post(&context_path("/acme/space/"))
        .add_header("Authorization", bearer(&creator))
        .json(&json!({ "name": "reports", "confidentiality": "INTERNAL" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .client()
        .delete(&context_path("/acme"))
        .add_header("Authorization", bearer(&creator))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_invalid_space_name_is_bad_request() {
    let app = setup_test_app().await;
    let admin = token_with_roles(&[SUPERUSER]);

    let response = app
        .client()
        .post(&context_path("/acme/space/"))
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "re_ports", "confidentiality": "PRIVATE" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["errorCode"], 20001);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_test_app().await;
    let admin = token_with_roles(&[SUPERUSER]);

    let response = app
        .client()
        .post(&context_path("/acme/space/"))
        .add_header("Authorization", bearer(&admin))
        .json(&json!({ "name": "reports", "confidentiality": "SECRET" }))
        .await;

    assert_eq!(response.status_code(), 400);
}
