use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use super::extract::{ApiJson, ApiQuery};
use super::validation::require_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::{EventRecord, EventUpdate, GalleryItem};
use crate::services::UserSummary;
use crate::services::event_service::{CreateEvent, EventDetails, GalleryUpload};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerQuery {
    #[serde(default)]
    pub viewer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub update: EventUpdate,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/join", post(join_event).delete(leave_event))
        .route("/events/{id}/participants", get(participants))
        .route("/events/{id}/gallery", post(add_gallery_item))
        .route("/events/user/{id}", get(events_by_creator))
        .route("/events/joined/{id}", get(events_joined))
}

/// GET /events?viewerId=
/// Hides events from creators the viewer blocked and, for content-filtered
/// minors, mature events.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ViewerQuery>,
) -> Result<Json<ApiResponse<Vec<EventRecord>>>, ApiError> {
    let events = state.events().list(query.viewer_id.as_deref()).await?;
    Ok(Json(ApiResponse::success(events)))
}

/// POST /events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateEvent>,
) -> Result<(StatusCode, Json<ApiResponse<EventRecord>>), ApiError> {
    require_id(&payload.created_by, "createdBy")?;
    let event = state.events().create(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

/// GET /events/{id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EventDetails>>, ApiError> {
    Ok(Json(ApiResponse::success(state.events().get(&id).await?)))
}

/// PUT /events/{id}
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateEventRequest>,
) -> Result<Json<ApiResponse<EventRecord>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    let event = state.events().update(&id, user_id, payload.update).await?;
    Ok(Json(ApiResponse::success(event)))
}

/// DELETE /events/{id}
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    state.events().delete(&id, user_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Event deleted",
    ))))
}

/// POST /events/{id}/join
pub async fn join_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    state.events().join(&id, user_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Joined event",
    ))))
}

/// DELETE /events/{id}/join
pub async fn leave_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    state.events().leave(&id, user_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Left event"))))
}

/// GET /events/{id}/participants
pub async fn participants(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.events().participants(&id).await?,
    )))
}

/// POST /events/{id}/gallery
pub async fn add_gallery_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<GalleryUpload>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<GalleryItem>>>), ApiError> {
    require_id(&payload.user_id, "userId")?;
    let gallery = state.events().add_gallery_item(&id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(gallery))))
}

/// GET /events/user/{id}
pub async fn events_by_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<EventRecord>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.events().list_by_creator(&id).await?,
    )))
}

/// GET /events/joined/{id}
pub async fn events_joined(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<EventRecord>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.events().list_joined(&id).await?,
    )))
}
