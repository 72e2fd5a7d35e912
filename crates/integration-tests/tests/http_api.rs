//! HTTP API behavior over the assembled router.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower_sessions::SessionStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;

use qrtag_core::Email;
use qrtag_integration_tests::{
    MultipartForm, TEST_BODY_LIMIT, TEST_PASSWORD, TestApp, TestClient, jpeg_bytes, png_bytes,
};
use qrtag_server::middleware::session::{SESSION_COOKIE_NAME, session_layer_with_store};
use qrtag_server::services::AuthProvider;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let mut client = app.client();

    let live = client.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body.as_ref(), b"ok");

    let ready = client.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_claim_status_reports_unclaimed_then_claimed() {
    let app = TestApp::new();
    let mut client = app.client();

    let missing = client.get("/claim-status").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert!(missing.json()["error"].is_string());

    let before = client.get("/claim-status?code=ab12cd34").await;
    assert_eq!(before.status, StatusCode::OK);
    assert_eq!(before.json(), json!({ "claimed": false }));

    let registered = client.register("sari@example.com", Some("ab12cd34")).await;
    assert_eq!(registered.status, StatusCode::CREATED);

    let after = client.get("/claim-status?code=ab12cd34").await;
    assert_eq!(after.status, StatusCode::OK);
    let body = after.json();
    assert_eq!(body["claimed"], true);
    assert!(body["reason"].is_string());
}

#[tokio::test]
async fn test_register_starts_a_session() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client.register("sari@example.com", Some("ab12cd34")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(client.has_session());

    let profile = &response.json()["profile"];
    assert_eq!(profile["code"], "ab12cd34");
    assert_eq!(profile["email"], "sari@example.com");

    let me = client.get("/me/profile").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["profile"]["code"], "ab12cd34");

    let logout = client.post_empty("/auth/logout").await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);

    let after = client.get("/me/profile").await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_with_claimed_code_is_conflict() {
    let app = TestApp::new();

    let first = app.client().register("first@example.com", Some("ab12cd34")).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let mut second = app.client();
    let response = second.register("second@example.com", Some("ab12cd34")).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json()["error"],
        "This tag has already been claimed"
    );
    assert!(!second.has_session());
    assert_eq!(app.auth.account_count(), 1);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new();
    let mut client = app.client();

    let bad_email = client
        .post_json(
            "/auth/register",
            &json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let short_password = client
        .post_json(
            "/auth/register",
            &json!({ "email": "sari@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);

    let malformed = client
        .post_json("/auth/register", &json!({ "email": "sari@example.com" }))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.auth.account_count(), 0);
    assert!(app.profiles.is_empty());
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let app = TestApp::new();
    app.client().register("sari@example.com", Some("ab12cd34")).await;

    let mut client = app.client();
    let wrong = client
        .post_json(
            "/auth/login",
            &json!({ "email": "sari@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(!client.has_session());

    let ok = client
        .post_json(
            "/auth/login",
            &json!({ "email": "sari@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let body = ok.json();
    assert_eq!(body["email"], "sari@example.com");
    assert_eq!(body["code"], "ab12cd34");
    assert!(client.has_session());
}

#[tokio::test]
async fn test_claim_requires_matching_session() {
    let app = TestApp::new();
    let email = Email::parse("late@example.com").unwrap();
    let account = app.auth.create_account(&email, TEST_PASSWORD).await.unwrap();

    let mut anonymous = app.client();
    let unauthenticated = anonymous
        .post_json(
            "/claim",
            &json!({ "code": "ab12cd34", "accountId": account.to_string() }),
        )
        .await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);

    let mut client = app.client();
    let login = client
        .post_json(
            "/auth/login",
            &json!({ "email": "late@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.json()["code"].is_null());

    let other = client
        .post_json(
            "/claim",
            &json!({
                "code": "ab12cd34",
                "accountId": "00000000-0000-4000-8000-000000000000",
            }),
        )
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let missing = client
        .post_json("/claim", &json!({ "code": "ab12cd34" }))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let claimed = client
        .post_json(
            "/claim",
            &json!({ "code": "ab12cd34", "accountId": account.to_string() }),
        )
        .await;
    assert_eq!(claimed.status, StatusCode::OK);
    let body = claimed.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["record"]["code"], "ab12cd34");
    assert_eq!(body["record"]["claimedBy"], account.to_string());

    let again = client
        .post_json(
            "/claim",
            &json!({ "code": "zz99yy88", "accountId": account.to_string() }),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_public_profile_hides_private_fields() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;

    let form = MultipartForm::new()
        .text("displayName", "Sari")
        .text("bio", "Call me if found")
        .text("instagram", "@sari");
    let updated = client.post_multipart("/me/profile", form).await;
    assert_eq!(updated.status, StatusCode::OK);

    let mut visitor = app.client();
    let response = visitor.get("/profile/ab12cd34").await;
    assert_eq!(response.status, StatusCode::OK);

    let user = &response.json()["user"];
    assert_eq!(user["displayName"], "Sari");
    assert_eq!(user["bio"], "Call me if found");
    assert_eq!(user["socials"][0]["platform"], "instagram");
    assert_eq!(user["socials"][0]["url"], "https://instagram.com/sari");
    assert!(user.get("email").is_none());
    assert!(user.get("accountId").is_none());

    let unknown = visitor.get("/profile/nope1234").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update_with_photo() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;

    let form = MultipartForm::new()
        .text("name", "Sari")
        .text("age", "27")
        .file("photo", "me.png", "image/png", &png_bytes(1200, 900));
    let response = client.post_multipart("/me/profile", form).await;
    assert_eq!(response.status, StatusCode::OK);

    let profile = &response.json()["profile"];
    assert_eq!(profile["displayName"], "Sari");
    assert_eq!(profile["age"], 27);
    let photo = profile["photo"].as_str().unwrap();
    assert!(photo.starts_with("memory://objects/"));
    assert!(photo.contains("?t="));
    assert_eq!(app.objects.len(), 1);
}

#[tokio::test]
async fn test_profile_update_rejects_blank_name() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;
    client
        .post_multipart("/me/profile", MultipartForm::new().text("displayName", "Sari"))
        .await;

    let response = client
        .post_multipart("/me/profile", MultipartForm::new().text("displayName", "  "))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let me = client.get("/me/profile").await;
    assert_eq!(me.json()["profile"]["displayName"], "Sari");
}

#[tokio::test]
async fn test_failed_photo_upload_is_bad_gateway() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;
    app.objects.set_fail_puts(true);

    let form = MultipartForm::new()
        .text("displayName", "Renamed")
        .file("photo", "me.jpg", "image/jpeg", &jpeg_bytes(64, 64, 80));
    let response = client.post_multipart("/me/profile", form).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let me = client.get("/me/profile").await;
    let profile = &me.json()["profile"];
    assert_eq!(profile["displayName"], "");
    assert!(profile["photo"].is_null());
}

#[tokio::test]
async fn test_empty_photo_part_is_ignored() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;

    let form = MultipartForm::new()
        .text("displayName", "Sari")
        .file("photo", "", "application/octet-stream", &[]);
    let response = client.post_multipart("/me/profile", form).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(app.objects.is_empty());
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("sari@example.com", Some("ab12cd34")).await;

    let mismatch = client
        .post_json(
            "/auth/password",
            &json!({ "password": "new-password-1", "confirmPassword": "new-password-2" }),
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);

    let weak = client
        .post_json(
            "/auth/password",
            &json!({ "password": "short", "confirmPassword": "short" }),
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let changed = client
        .post_json(
            "/auth/password",
            &json!({ "password": "new-password-1", "confirmPassword": "new-password-1" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let mut other = app.client();
    let old = other
        .post_json(
            "/auth/login",
            &json!({ "email": "sari@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = other
        .post_json(
            "/auth/login",
            &json!({ "email": "sari@example.com", "password": "new-password-1" }),
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_requires_session() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client
        .post_json(
            "/auth/password",
            &json!({ "password": "new-password-1", "confirmPassword": "new-password-1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

/// Session store whose backend is always down.
#[derive(Debug, Clone)]
struct UnreachableSessionStore;

#[async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn save(&self, _record: &Record) -> session_store::Result<()> {
        Err(session_store::Error::Backend("unreachable".to_string()))
    }

    async fn load(&self, _id: &Id) -> session_store::Result<Option<Record>> {
        Err(session_store::Error::Backend("unreachable".to_string()))
    }

    async fn delete(&self, _id: &Id) -> session_store::Result<()> {
        Err(session_store::Error::Backend("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_login_fails_when_session_cannot_be_stored() {
    let app = TestApp::new();
    app.client().register("sari@example.com", Some("ab12cd34")).await;

    let router = qrtag_server::routes::routes(TEST_BODY_LIMIT)
        .layer(session_layer_with_store(UnreachableSessionStore, false))
        .with_state(app.state.clone());
    let mut client = TestClient::new(router);

    let body = json!({ "email": "sari@example.com", "password": TEST_PASSWORD });
    let request = Request::post("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={}", Id::default()))
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = client.send(request).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Internal server error");
}
