use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use crate::integration::common::{PASSWORD, TestApp, setup_protected_app, setup_test_app};

async fn register_ann(app: &TestApp) -> serde_json::Value {
    let (status, body) = app
        .post(
            "/auth/register",
            json!({"username": "ann", "email": "Ann@X.com", "password": "Abcdef12"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    app.post(
        "/auth/token",
        json!({"username": username, "password": password}),
    )
    .await
}

fn timestamp(value: &serde_json::Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn register_then_login() {
    let app = setup_test_app().await;

    let user = register_ann(&app).await;
    assert_eq!(user["email"], "ann@x.com");
    assert!(user.get("hashed_password").is_none());

    let (status, token) = login(&app, "ann", "Abcdef12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");
    assert!(token["access_token"].as_str().unwrap().contains('.'));

    let (status, body) = login(&app, "ann", "Wrong1234").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, unknown) = login(&app, "nobody", "Abcdef12").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, body);

    let (status, _) = login(&app, "ann@x.com", "Abcdef12").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_accepts_form_encoding() {
    let app = setup_test_app().await;
    register_ann(&app).await;

    let request = Request::post("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=ann&password=Abcdef12"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn duplicate_registration_and_weak_password() {
    let app = setup_test_app().await;
    register_ann(&app).await;

    let (status, body) = app
        .post(
            "/auth/register",
            json!({"username": "ann", "email": "other@x.com", "password": "Abcdef12"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already registered");

    let (status, body) = app
        .post(
            "/auth/register",
            json!({"username": "bob", "email": "ann@x.com", "password": "Abcdef12"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");

    let (status, body) = app
        .post(
            "/auth/register",
            json!({"username": "bob", "email": "bob@x.com", "password": "short"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn me_requires_valid_token() {
    let app = setup_test_app().await;
    register_ann(&app).await;
    let (_, token) = login(&app, "ann", "Abcdef12").await;
    let token = token["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.send("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ann");
    assert!(body["last_login"].is_string());

    let request = Request::get("/auth/me").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let (status, _) = app
        .send("GET", "/auth/me", None, Some("not.a.token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_user_is_forbidden() {
    let app = setup_test_app().await;
    let token = app.user_token("carol", false).await;
    app.db.user_repo().set_active("carol", false).await.unwrap();

    let (status, body) = app.send("GET", "/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = login(&app, "carol", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_profile_and_change_password() {
    let app = setup_test_app().await;
    register_ann(&app).await;
    let token = app.user_token("dave", false).await;

    let (_, before) = app.send("GET", "/auth/me", None, Some(&token)).await;
    let (status, body) = app
        .send(
            "PUT",
            "/auth/me",
            Some(json!({"full_name": "Dave Bowman", "bio": "Pod bay"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Dave Bowman");
    assert_eq!(body["email"], "dave@example.com");
    assert_eq!(body["created_at"], before["created_at"]);
    assert!(timestamp(&body["updated_at"]) > timestamp(&before["updated_at"]));

    let (status, _) = app
        .send("PUT", "/auth/me", Some(json!({"email": "ann@x.com"})), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/auth/me/change-password",
            Some(json!({"old_password": "Wrong1234", "new_password": "Newpass99"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/auth/me/change-password",
            Some(json!({"old_password": PASSWORD, "new_password": "Newpass99"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = login(&app, "dave", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "dave", "Newpass99").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_writes_need_token_and_superuser_for_delete() {
    let app = setup_protected_app().await;
    let writer = app.user_token("writer", false).await;
    let admin = app.user_token("admin", true).await;

    let (status, _) = app
        .post("/celestial-bodies", json!({"name": "Mars", "type": "planet"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/celestial-bodies",
            Some(json!({"name": "Mars", "type": "planet"})),
            Some(&writer),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (status, _) = app.get(&format!("/celestial-bodies/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/celestial-bodies/{id}");
    let (status, _) = app.send("DELETE", &uri, None, Some(&writer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("DELETE", &uri, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
