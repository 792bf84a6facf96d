//! HTTP surface: routing, bearer auth and the error taxonomy as status codes.
//!
//! Run with: `cargo test --test api_test`
mod common;

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use uuid::Uuid;

use common::{setup_db, user};
use contract_workflow::auth::AuthState;
use contract_workflow::auth::jwt::Claims;
use contract_workflow::config::AppConfig;
use contract_workflow::handlers;
use contract_workflow::models::users::Roles;

const TEST_SECRET: &str = "api-test-secret-at-least-256-bits-long-xxxxxxxxxxxx";

fn token_for(user_id: Uuid, email: &str) -> String {
    token_with(user_id, Some(email))
}

fn token_with(user_id: Uuid, email: Option<&str>) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: None,
        email: email.map(str::to_string),
        name: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to encode test JWT")
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        port: 0,
        reference_prefix: "CTR".to_string(),
        principal_cache_ttl: Duration::from_secs(60),
    }
}

macro_rules! app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($db.clone()))
                .app_data(web::Data::new(AuthState::new(
                    TEST_SECRET,
                    Duration::from_secs(60),
                )))
                .app_data(web::Data::new(config()))
                .service(web::scope("/api").configure(handlers::init_routes)),
        )
        .await
    };
}

/// Token for a freshly provisioned user with `role`.
async fn login(db: &DatabaseConnection, role: Roles) -> (Uuid, String) {
    let principal = user(db, role).await;
    (principal.user_id, token_for(principal.user_id, "ignored@example.com"))
}

fn contract_body() -> Value {
    json!({
        "title": "Ticketing ops",
        "contract_type": "it_services",
        "description": "Operate and maintain the internal ticketing platform",
        "target_persons": 3,
        "budget_min": 1000.0,
        "budget_max": 5000.0,
        "start_date": "2026-01-01",
        "end_date": "2026-12-31"
    })
}

#[actix_web::test]
async fn test_missing_token_is_unauthorized() {
    let db = setup_db().await;
    let app = app!(db);

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_first_sight_user_becomes_client() {
    let db = setup_db().await;
    let app = app!(db);
    let id = Uuid::new_v4();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token_for(id, "new@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["role"], "client");
    assert_eq!(body["email"], "new@example.com");
}

#[actix_web::test]
async fn test_create_and_submit_over_http() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, token) = login(&db, Roles::Client).await;

    let req = test::TestRequest::post()
        .uri("/api/contracts")
        .insert_header(bearer(&token))
        .set_json(contract_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "draft");
    assert_eq!(created["currency"], "EUR");
    assert_eq!(created["legacy_status"], false);
    assert!(created["reference_number"].as_str().unwrap().starts_with("CTR-"));
    let actions = created["allowed_actions"].as_array().unwrap();
    assert!(actions.contains(&json!("submit")));

    let id = created["id"].as_str().unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/api/contracts/{id}/submit"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let submitted: Value = test::read_body_json(resp).await;
    assert_eq!(submitted["status"], "pending_procurement");
}

#[actix_web::test]
async fn test_error_taxonomy_maps_to_status_codes() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, client) = login(&db, Roles::Client).await;
    let (_, legal) = login(&db, Roles::LegalCounsel).await;

    let mut invalid = contract_body();
    invalid["budget_min"] = json!(500.0);
    invalid["budget_max"] = json!(100.0);
    let req = test::TestRequest::post()
        .uri("/api/contracts")
        .insert_header(bearer(&client))
        .set_json(invalid)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["fields"][0]["field"], "budget");

    let req = test::TestRequest::post()
        .uri("/api/contracts")
        .insert_header(bearer(&client))
        .set_json(contract_body())
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap().to_string();

    // Wrong role: forbidden.
    let req = test::TestRequest::post()
        .uri(&format!("/api/contracts/{id}/procurement/approve"))
        .insert_header(bearer(&client))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Right role, wrong status: conflict.
    let req = test::TestRequest::post()
        .uri(&format!("/api/contracts/{id}/legal/approve"))
        .insert_header(bearer(&legal))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_transition");

    let req = test::TestRequest::get()
        .uri(&format!("/api/contracts/{}", Uuid::new_v4()))
        .insert_header(bearer(&client))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_user_administration_is_admin_only() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, admin) = login(&db, Roles::Admin).await;
    let (client_id, client) = login(&db, Roles::Client).await;

    let req = test::TestRequest::get()
        .uri("/api/users")
        .insert_header(bearer(&client))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&admin))
        .set_json(json!({"email": "Legal@Example.com", "role": "legal_counsel"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let provisioned: Value = test::read_body_json(resp).await;
    assert_eq!(provisioned["email"], "legal@example.com");
    assert_eq!(provisioned["role"], "legal_counsel");

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/{client_id}/role"))
        .insert_header(bearer(&admin))
        .set_json(json!({"role": "contract_coordinator"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The role change is visible on the user's next request.
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&client))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["role"], "contract_coordinator");

    let req = test::TestRequest::get()
        .uri("/api/users?page=1&limit=10")
        .insert_header(bearer(&admin))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["has_next"], false);
}

#[actix_web::test]
async fn test_removed_user_is_refused() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, admin) = login(&db, Roles::Admin).await;
    let (client_id, client) = login(&db, Roles::Client).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{client_id}"))
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&client))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_provisioned_role_survives_first_sign_in() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, admin) = login(&db, Roles::Admin).await;

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&admin))
        .set_json(json!({"email": "pm@example.com", "role": "procurement_manager"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // The identity issuer knows the account under its own subject.
    let subject = Uuid::new_v4();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token_for(subject, "pm@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = test::read_body_json(resp).await;
    assert_eq!(me["id"], subject.to_string());
    assert_eq!(me["role"], "procurement_manager");

    // Someone else presenting the same email is a conflict, not a server error.
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token_for(Uuid::new_v4(), "pm@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_account_provisioned_under_the_issuer_id() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, admin) = login(&db, Roles::Admin).await;
    let subject = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&admin))
        .set_json(json!({"id": subject, "email": "legal@example.com", "role": "legal_counsel"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let provisioned: Value = test::read_body_json(resp).await;
    assert_eq!(provisioned["id"], subject.to_string());

    // Known subjects need no email claim.
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token_with(subject, None)))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["role"], "legal_counsel");

    let req = test::TestRequest::post()
        .uri("/api/users")
        .insert_header(bearer(&admin))
        .set_json(json!({"id": subject, "email": "other@example.com", "role": "client"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fields"][0]["field"], "id");
}

#[actix_web::test]
async fn test_unknown_subject_without_email_is_unauthorized() {
    let db = setup_db().await;
    let app = app!(db);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token_with(Uuid::new_v4(), None)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_oversized_page_is_a_validation_error() {
    let db = setup_db().await;
    let app = app!(db);
    let (_, admin) = login(&db, Roles::Admin).await;

    for uri in [
        format!("/api/users?page={}", u64::MAX),
        format!("/api/contracts?page={}", u64::MAX),
    ] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "page");
    }
}
