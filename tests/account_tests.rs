mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, token_from, years_ago};
use mirro::entities::{
    blocked_users, event_participants, events, follows, parental_controls, password_reset_tokens,
    reports, users,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

#[tokio::test]
async fn test_register_classifies_by_age() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Kid",
                "username": "kid",
                "email": "Kid@Example.com",
                "password": "password123",
                "dateOfBirth": years_ago(15),
                "guardianEmail": "Parent@Example.com"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["ageCategory"], "minor");
    assert_eq!(body["data"]["email"], "kid@example.com");
    assert_eq!(body["data"]["followersCount"], 0);
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("guardianEmail").is_none());

    let id = app.register_adult("adult").await;
    let (_, body) = app.get(&format!("/api/users/{id}")).await;
    assert_eq!(body["data"]["ageCategory"], "adult");
}

#[tokio::test]
async fn test_register_rejects_invalid_ages() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Tiny",
                "username": "tiny",
                "email": "tiny@example.com",
                "password": "password123",
                "dateOfBirth": years_ago(12),
                "guardianEmail": "parent@example.com"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You must be at least 13 years old to register");

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Teen",
                "username": "teen",
                "email": "teen@example.com",
                "password": "password123",
                "dateOfBirth": years_ago(16)
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Guardian email is required for users under 18");

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Future",
                "username": "future",
                "email": "future@example.com",
                "password": "password123",
                "dateOfBirth": "2999-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_conflicts() {
    let app = spawn_app().await;
    app.register_adult("sam").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Sam Two",
                "username": "sam",
                "email": "other@example.com",
                "password": "password123"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({
                "name": "Sam Two",
                "username": "sam2",
                "email": "SAM@example.com",
                "password": "password123"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_login_and_session() {
    let app = spawn_app().await;
    let id = app.register_adult("sam").await;

    let (status, _, _) = app.login("sam@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app.login("nobody@example.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, cookie) = app.login(" SAM@example.com ", "password123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], id.as_str());
    let cookie = cookie.expect("login sets a session cookie");

    let (status, body, _) = app
        .send(Method::GET, "/api/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "sam");

    let (status, _) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.send(Method::POST, "/api/auth/logout", None, Some(&cookie))
        .await;
    let (status, _, _) = app
        .send(Method::GET, "/api/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = spawn_app().await;
    app.register_adult("sam").await;

    let (status, unknown) = app
        .post(
            "/api/auth/forgot-password",
            json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.mailer.sent().is_empty());

    let (status, known) = app
        .post(
            "/api/auth/forgot-password",
            json!({ "email": "sam@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown, known);

    let token = token_from(&app.mailer.sent_to("sam@example.com")[0]);

    let (_, body) = app
        .get(&format!("/api/auth/reset-password?token={token}"))
        .await;
    assert_eq!(body["data"]["valid"], true);

    let (status, _) = app
        .post(
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "brand-new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        app.login("sam@example.com", "password123").await.0,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("sam@example.com", "brand-new-secret").await.0,
        StatusCode::OK
    );

    let (status, body) = app
        .post(
            "/api/auth/reset-password",
            json!({ "token": token, "newPassword": "another-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired reset token");

    let (_, body) = app
        .get(&format!("/api/auth/reset-password?token={token}"))
        .await;
    assert_eq!(body["data"]["valid"], false);
}

#[tokio::test]
async fn test_delete_account_requires_owner_session() {
    let app = spawn_app().await;
    let sam = app.register_adult("sam").await;
    let other = app.register_adult("other").await;

    let (status, _, _) = app
        .send(Method::DELETE, &format!("/api/users/{sam}"), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, _, cookie) = app.login("other@example.com", "password123").await;
    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/users/{sam}"),
            None,
            cookie.as_deref(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/users/{other}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_account_leaves_no_rows_behind() {
    let app = spawn_app().await;
    let kid = app
        .minor_with_pin("kid", "parent@example.com", "1234")
        .await;
    let friend = app.register_adult("friend").await;

    app.post(
        "/api/users/follow",
        json!({ "userId": kid, "targetUserId": friend }),
    )
    .await;
    app.post(
        "/api/users/follow",
        json!({ "userId": friend, "targetUserId": kid }),
    )
    .await;

    let (_, own_event) = app
        .post(
            "/api/events",
            json!({
                "createdBy": kid, "title": "Study group", "date": "2026-11-01",
                "time": "18:00", "location": "Library", "isPublic": false
            }),
        )
        .await;
    let own_event = own_event["data"]["id"].as_str().unwrap().to_string();

    let (_, friend_event) = app
        .post(
            "/api/events",
            json!({
                "createdBy": friend, "title": "Picnic", "date": "2026-11-02",
                "time": "12:00", "location": "Park"
            }),
        )
        .await;
    let friend_event = friend_event["data"]["id"].as_str().unwrap().to_string();

    app.post(
        &format!("/api/events/{friend_event}/join"),
        json!({ "userId": kid }),
    )
    .await;
    app.post(
        &format!("/api/events/{own_event}/join"),
        json!({ "userId": friend }),
    )
    .await;
    app.post(
        "/api/moderation/report",
        json!({ "reporterId": friend, "reportedEventId": own_event, "reason": "spam" }),
    )
    .await;
    app.post(
        "/api/moderation/report",
        json!({ "reporterId": kid, "reportedUserId": friend, "reason": "harassment" }),
    )
    .await;
    app.post(
        "/api/moderation/block",
        json!({ "userId": kid, "targetUserId": friend }),
    )
    .await;
    app.post("/api/auth/forgot-password", json!({ "email": "kid@example.com" }))
        .await;

    let (_, _, cookie) = app.login("kid@example.com", "password123").await;
    let (status, body, _) = app
        .send(
            Method::DELETE,
            &format!("/api/users/{kid}"),
            None,
            cookie.as_deref(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let conn = &app.state.store().conn;
    assert_eq!(users::Entity::find().count(conn).await.unwrap(), 1);
    assert_eq!(follows::Entity::find().count(conn).await.unwrap(), 0);
    assert_eq!(blocked_users::Entity::find().count(conn).await.unwrap(), 0);
    assert_eq!(reports::Entity::find().count(conn).await.unwrap(), 0);
    assert_eq!(events::Entity::find().count(conn).await.unwrap(), 1);
    assert_eq!(event_participants::Entity::find().count(conn).await.unwrap(), 0);
    assert_eq!(parental_controls::Entity::find().count(conn).await.unwrap(), 0);
    assert_eq!(
        password_reset_tokens::Entity::find().count(conn).await.unwrap(),
        0
    );

    let (status, _) = app.get(&format!("/api/users/{kid}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
