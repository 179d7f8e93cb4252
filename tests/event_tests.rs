mod common;

use axum::http::StatusCode;
use common::{TestApp, spawn_app};
use serde_json::{Value, json};

async fn create_event(app: &TestApp, body: Value) -> (StatusCode, Value) {
    app.post("/api/events", body).await
}

fn event(created_by: &str, title: &str) -> Value {
    json!({
        "createdBy": created_by,
        "title": title,
        "description": "Bring snacks",
        "date": "2026-11-20",
        "time": "19:30",
        "location": "Community hall"
    })
}

#[tokio::test]
async fn test_create_and_fetch_event() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;

    let (status, body) = create_event(&app, event(&host, "Board games")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isPublic"], true);
    assert_eq!(body["data"]["mediaGallery"], json!([]));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/events/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Board games");
    assert_eq!(body["data"]["creator"]["username"], "host");
    assert_eq!(body["data"]["participantCount"], 0);

    let (status, _) = app.get("/api/events/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = create_event(
        &app,
        json!({ "createdBy": host, "title": "  ", "date": "2026-11-20", "time": "19:30", "location": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_restricted_minor_can_only_create_private_events() {
    let app = spawn_app().await;
    let kid = app
        .minor_with_pin("kid", "parent@example.com", "1234")
        .await;

    let (status, body) = create_event(&app, event(&kid, "Party")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("private events only"));

    let mut private = event(&kid, "Homework club");
    private["isPublic"] = json!(false);
    let (status, body) = create_event(&app, private).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(
            &format!("/api/events/{id}"),
            json!({ "userId": kid, "isPublic": true }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.put(
        "/api/parental-controls/settings",
        json!({ "userId": kid, "pin": "1234", "settings": { "eventCreationRestricted": false } }),
    )
    .await;

    let (status, _) = create_event(&app, event(&kid, "Party")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_only_creator_can_edit_or_delete() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;
    let guest = app.register_adult("guest").await;

    let (_, body) = create_event(&app, event(&host, "Book club")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(
            &format!("/api/events/{id}"),
            json!({ "userId": guest, "title": "Hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            &format!("/api/events/{id}"),
            json!({ "userId": host, "title": "Book club v2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Book club v2");
    assert_eq!(body["data"]["location"], "Community hall");

    let (status, _) = app
        .delete(&format!("/api/events/{id}"), json!({ "userId": guest }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.post(&format!("/api/events/{id}/join"), json!({ "userId": guest }))
        .await;

    let (status, _) = app
        .delete(&format!("/api/events/{id}"), json!({ "userId": host }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/api/events/joined/{guest}")).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_join_and_leave() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;
    let guest = app.register_adult("guest").await;

    let (_, body) = create_event(&app, event(&host, "Hike")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let join = format!("/api/events/{id}/join");

    let (status, _) = app.post(&join, json!({ "userId": guest })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post(&join, json!({ "userId": guest })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Already joined this event");

    let (_, body) = app.get(&format!("/api/events/{id}/participants")).await;
    assert_eq!(body["data"][0]["username"], "guest");

    let (_, body) = app.get(&format!("/api/events/joined/{guest}")).await;
    assert_eq!(body["data"][0]["title"], "Hike");

    let (_, body) = app.get(&format!("/api/events/user/{host}")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&join, json!({ "userId": guest })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&join, json!({ "userId": guest })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blocks_hide_and_bar_events() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;
    let viewer = app.register_adult("viewer").await;

    let (_, body) = create_event(&app, event(&host, "Open mic")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/api/events?viewerId={viewer}")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    app.post(
        "/api/moderation/block",
        json!({ "userId": viewer, "targetUserId": host }),
    )
    .await;

    let (_, body) = app.get(&format!("/api/events?viewerId={viewer}")).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = app.get("/api/events").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(&format!("/api/events/{id}/join"), json!({ "userId": viewer }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_content_filter_hides_mature_events_from_minors() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;
    let kid = app
        .minor_with_pin("kid", "parent@example.com", "1234")
        .await;

    let mut mature = event(&host, "Late show");
    mature["isMature"] = json!(true);
    let (_, body) = create_event(&app, mature).await;
    let mature_id = body["data"]["id"].as_str().unwrap().to_string();
    create_event(&app, event(&host, "Matinee")).await;

    let (_, body) = app.get(&format!("/api/events?viewerId={kid}")).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Matinee"]);

    let (status, _) = app
        .post(
            &format!("/api/events/{mature_id}/join"),
            json!({ "userId": kid }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&format!("/api/events?viewerId={host}")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_gallery_upload_rules() {
    let app = spawn_app().await;
    let host = app.register_adult("host").await;
    let guest = app.register_adult("guest").await;
    let stranger = app.register_adult("stranger").await;

    let (_, body) = create_event(&app, event(&host, "Beach day")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let gallery = format!("/api/events/{id}/gallery");

    app.post(&format!("/api/events/{id}/join"), json!({ "userId": guest }))
        .await;

    let (status, body) = app
        .post(
            &gallery,
            json!({ "userId": guest, "url": "https://cdn.example.com/a.jpg", "mediaType": "image" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"][0]["uploadedBy"], guest.as_str());

    let (status, _) = app
        .post(
            &gallery,
            json!({ "userId": stranger, "url": "https://cdn.example.com/b.jpg", "mediaType": "image" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &gallery,
            json!({ "userId": host, "url": "ftp://cdn.example.com/c.jpg", "mediaType": "image" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &gallery,
            json!({ "userId": host, "url": "https://cdn.example.com/c.gif", "mediaType": "audio" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            &gallery,
            json!({ "userId": host, "url": "https://cdn.example.com/d.mp4", "mediaType": "video" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_private_events_are_listed_only_for_creator_and_participants() {
    let app = spawn_app().await;
    let kid = app
        .minor_with_pin("kid", "parent@example.com", "1234")
        .await;
    let friend = app.register_adult("friend").await;
    let outsider = app.register_adult("outsider").await;

    let mut private = event(&kid, "Homework club");
    private["isPublic"] = json!(false);
    let (_, body) = create_event(&app, private).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    create_event(&app, event(&friend, "Picnic")).await;

    let titles = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = app.get("/api/events").await;
    assert_eq!(titles(&body), vec!["Picnic"]);

    let (_, body) = app.get(&format!("/api/events?viewerId={outsider}")).await;
    assert_eq!(titles(&body), vec!["Picnic"]);

    let (_, body) = app.get(&format!("/api/events?viewerId={kid}")).await;
    assert_eq!(titles(&body).len(), 2);

    app.post(&format!("/api/events/{id}/join"), json!({ "userId": friend }))
        .await;
    let (_, body) = app.get(&format!("/api/events?viewerId={friend}")).await;
    assert!(titles(&body).contains(&"Homework club".to_string()));
}
