use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use keyforge_db::repositories::admin_repo::AdminRepository;
use keyforge_panel::{AppState, router};

async fn test_app() -> Router {
    let pool = keyforge_db::db::init_memory_db()
        .await
        .expect("in-memory db");
    // Low bcrypt cost keeps the suite fast; never do this outside tests.
    let hash = bcrypt::hash("admin123", 4).expect("hash");
    AdminRepository::new(pool.clone())
        .create("admin", &hash)
        .await
        .expect("seed admin");
    router(AppState::new(pool, 3600))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string());
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, set_cookie, json)
}

async fn login(app: &Router, path: &str, username: &str, password: &str) -> String {
    let (status, cookie, _) = send(
        app,
        "POST",
        path,
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie.expect("session cookie")
}

/// Registers a reseller through the real endpoints and returns their
/// session cookie plus the admin's.
async fn register_reseller(app: &Router, username: &str, credits: i64) -> (String, String) {
    let admin = login(app, "/api/admin/login", "admin", "admin123").await;

    let (status, _, body) = send(
        app,
        "POST",
        "/api/admin/generate-tokens",
        Some(&admin),
        Some(json!({ "count": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["tokens"][0]["token"].as_str().expect("token").to_string();

    let (status, _, _) = send(
        app,
        "POST",
        "/api/reseller/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
            "referralToken": token,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    if credits > 0 {
        let (status, _, body) = send(
            app,
            "GET",
            "/api/admin/resellers",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["resellers"]
            .as_array()
            .expect("resellers")
            .iter()
            .find(|r| r["username"] == username)
            .and_then(|r| r["id"].as_i64())
            .expect("reseller id");

        let (status, _, _) = send(
            app,
            "POST",
            "/api/admin/add-credits",
            Some(&admin),
            Some(json!({ "resellerId": id, "amount": credits })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let reseller = login(app, "/api/reseller/login", username, "secret1").await;
    (admin, reseller)
}

#[tokio::test]
async fn full_key_lifecycle_over_http() {
    let app = test_app().await;
    let (_admin, reseller) = register_reseller(&app, "alice", 3).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(json!({ "game": "CS2", "deviceLimit": 2, "expiryDate": "2099-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["key"]["key"].as_str().expect("key value").to_string();
    assert_eq!(body["key"]["status"], "active");

    // Verification binds the device and reports the post-bind count.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/verify",
        None,
        Some(json!({ "key": key, "hwid": "HW-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Key verified successfully");
    assert_eq!(body["data"]["devicesUsed"], 1);

    // Same hwid again is a no-op, not a second slot.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/verify",
        None,
        Some(json!({ "key": key, "hwid": "HW-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["devicesUsed"], 1);

    let (status, _, body) = send(&app, "GET", &format!("/api/key-status/{key}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], true);
    assert_eq!(body["data"]["status"], "active");

    // One credit spent.
    let (status, _, body) = send(&app, "GET", "/api/me", Some(&reseller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["credits"], 2);
    assert_eq!(body["user"]["keysGenerated"], 1);
}

#[tokio::test]
async fn device_limit_rejects_a_third_device() {
    let app = test_app().await;
    let (_admin, reseller) = register_reseller(&app, "bob", 1).await;

    let (_, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(json!({ "game": "Rust", "deviceLimit": 2, "expiryDate": "2099-06-01" })),
    )
    .await;
    let key = body["key"]["key"].as_str().expect("key value").to_string();

    for hwid in ["HW-A", "HW-B"] {
        let (status, _, _) = send(
            &app,
            "POST",
            "/api/verify",
            None,
            Some(json!({ "key": key, "hwid": hwid })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/verify",
        None,
        Some(json!({ "key": key, "hwid": "HW-C" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Device limit reached");

    // The full key still answers status polls.
    let (status, _, body) = send(&app, "GET", &format!("/api/key-status/{key}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], false);
    assert_eq!(body["data"]["status"], "full");
}

#[tokio::test]
async fn unknown_key_verify_is_404_but_status_is_200() {
    let app = test_app().await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/verify",
        None,
        Some(json!({ "key": "NOPE-NOPE-NOPE-NOPE", "hwid": "HW-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invalid key");

    let (status, _, body) =
        send(&app, "GET", "/api/key-status/NOPE-NOPE-NOPE-NOPE", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], false);
    assert_eq!(body["data"]["message"], "Invalid key");
    assert!(body["data"].get("status").is_none());
}

#[tokio::test]
async fn generate_key_without_credits_is_rejected_whole() {
    let app = test_app().await;
    let (_admin, reseller) = register_reseller(&app, "carol", 0).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(json!({ "game": "CS2", "deviceLimit": 1, "expiryDate": "2099-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient credits");

    let (_, _, body) = send(&app, "GET", "/api/reseller/keys", Some(&reseller), None).await;
    assert_eq!(body["keys"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn duplicate_custom_key_is_rejected() {
    let app = test_app().await;
    let (_admin, reseller) = register_reseller(&app, "dave", 3).await;

    let payload = json!({
        "game": "CS2",
        "deviceLimit": 1,
        "customKey": "DAVE-SPECIAL-0001",
        "expiryDate": "2099-01-01",
    });
    let (status, _, _) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Custom key already exists");
}

#[tokio::test]
async fn role_boundaries_are_enforced() {
    let app = test_app().await;
    let (admin, reseller) = register_reseller(&app, "erin", 1).await;

    // No cookie at all.
    let (status, _, _) = send(&app, "GET", "/api/reseller/keys", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Admins hold no credits and cannot mint keys.
    let (status, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&admin),
        Some(json!({ "game": "CS2", "deviceLimit": 1, "expiryDate": "2099-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin cannot generate keys");

    // Resellers cannot reach admin routes.
    let (status, _, _) = send(&app, "GET", "/api/admin/stats", Some(&reseller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_count_outside_range_is_rejected_not_clamped() {
    let app = test_app().await;
    let admin = login(&app, "/api/admin/login", "admin", "admin123").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/admin/generate-tokens",
        Some(&admin),
        Some(json!({ "count": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Count must be between 1 and 100");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/admin/generate-tokens",
        Some(&admin),
        Some(json!({ "count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Count must be between 1 and 100");

    // Nothing was issued by the rejected requests.
    let (_, _, body) = send(&app, "GET", "/api/admin/tokens", Some(&admin), None).await;
    assert_eq!(body["tokens"].as_array().map(Vec::len), Some(0));

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/admin/generate-tokens",
        Some(&admin),
        Some(json!({ "count": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tokens"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = test_app().await;
    let admin = login(&app, "/api/admin/login", "admin", "admin123").await;

    let (status, _, _) = send(&app, "POST", "/api/logout", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/api/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn used_referral_token_cannot_register_twice() {
    let app = test_app().await;
    let admin = login(&app, "/api/admin/login", "admin", "admin123").await;

    let (_, _, body) = send(
        &app,
        "POST",
        "/api/admin/generate-tokens",
        Some(&admin),
        Some(json!({ "count": 1 })),
    )
    .await;
    let token = body["tokens"][0]["token"].as_str().expect("token").to_string();

    let register = |username: &str| {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
            "referralToken": token.as_str(),
        })
    };

    let (status, _, _) = send(&app, "POST", "/api/reseller/register", None, Some(register("frank"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(&app, "POST", "/api/reseller/register", None, Some(register("grace"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid referral token");
}

#[tokio::test]
async fn api_usage_accumulates_per_key() {
    let app = test_app().await;
    let (_admin, reseller) = register_reseller(&app, "heidi", 1).await;

    let (_, _, body) = send(
        &app,
        "POST",
        "/api/reseller/generate-key",
        Some(&reseller),
        Some(json!({ "game": "CS2", "deviceLimit": 5, "expiryDate": "2099-01-01" })),
    )
    .await;
    let key = body["key"]["key"].as_str().expect("key value").to_string();

    send(&app, "POST", "/api/verify", None, Some(json!({ "key": key, "hwid": "HW-1" }))).await;
    send(&app, "GET", &format!("/api/key-status/{key}"), None, None).await;
    send(&app, "GET", &format!("/api/key-status/{key}"), None, None).await;

    let (status, _, body) = send(&app, "GET", "/api/reseller/api-usage", Some(&reseller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalRequests"], 3);
    assert_eq!(body["stats"]["usageByKey"][&key], 3);
}
