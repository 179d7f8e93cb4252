mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_follow_lifecycle() {
    let app = spawn_app().await;
    let sam = app.register_adult("sam").await;
    let alex = app.register_adult("alex").await;

    let pair = json!({ "userId": sam, "targetUserId": alex });

    let (status, _) = app.post("/api/users/follow", pair.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/users/follow", pair.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Already following this user");

    let (_, body) = app
        .get(&format!("/api/users/{sam}/is-following/{alex}"))
        .await;
    assert_eq!(body["data"]["isFollowing"], true);

    let (_, body) = app.get(&format!("/api/users/{alex}/followers")).await;
    assert_eq!(body["data"][0]["username"], "sam");

    let (_, body) = app.get(&format!("/api/users/{alex}")).await;
    assert_eq!(body["data"]["followersCount"], 1);
    assert_eq!(body["data"]["followingCount"], 0);

    let (status, _) = app.delete("/api/users/follow", pair.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete("/api/users/follow", pair).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not following this user");
}

#[tokio::test]
async fn test_cannot_follow_self() {
    let app = spawn_app().await;
    let sam = app.register_adult("sam").await;

    let (status, body) = app
        .post(
            "/api/users/follow",
            json!({ "userId": sam, "targetUserId": sam }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot follow yourself");
}

#[tokio::test]
async fn test_block_removes_follows_both_ways() {
    let app = spawn_app().await;
    let sam = app.register_adult("sam").await;
    let alex = app.register_adult("alex").await;

    app.post(
        "/api/users/follow",
        json!({ "userId": sam, "targetUserId": alex }),
    )
    .await;
    app.post(
        "/api/users/follow",
        json!({ "userId": alex, "targetUserId": sam }),
    )
    .await;

    let (status, _) = app
        .post(
            "/api/moderation/block",
            json!({ "userId": sam, "targetUserId": alex }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&format!("/api/users/{sam}")).await;
    assert_eq!(body["data"]["followersCount"], 0);
    assert_eq!(body["data"]["followingCount"], 0);

    let (_, body) = app.get(&format!("/api/moderation/block?userId={sam}")).await;
    assert_eq!(body["data"]["blockedUserIds"], json!([alex]));

    // Neither side can re-follow while the block stands.
    let (status, _) = app
        .post(
            "/api/users/follow",
            json!({ "userId": alex, "targetUserId": sam }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(
            "/api/users/follow",
            json!({ "userId": sam, "targetUserId": alex }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/moderation/block",
            json!({ "userId": sam, "targetUserId": alex }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already blocked");

    let (status, _) = app
        .delete(
            "/api/moderation/block",
            json!({ "userId": sam, "targetUserId": alex }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/users/follow",
            json!({ "userId": alex, "targetUserId": sam }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_report_validation_and_duplicates() {
    let app = spawn_app().await;
    let sam = app.register_adult("sam").await;
    let alex = app.register_adult("alex").await;

    let (status, _) = app
        .post(
            "/api/moderation/report",
            json!({ "reporterId": sam, "reason": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/moderation/report",
            json!({ "reporterId": sam, "reportedUserId": alex, "reason": "rude" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid report reason");

    let (status, _) = app
        .post(
            "/api/moderation/report",
            json!({ "reporterId": sam, "reportedUserId": sam, "reason": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let report = json!({
        "reporterId": sam,
        "reportedUserId": alex,
        "reason": "harassment",
        "description": "Repeated messages"
    });
    let (status, body) = app.post("/api/moderation/report", report.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["reason"], "harassment");

    let (status, _) = app.post("/api/moderation/report", report).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .get(&format!("/api/moderation/report?reporterId={sam}"))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/moderation/report?status=pending").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/moderation/report").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
