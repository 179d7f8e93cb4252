use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::extract::ApiJson;
use super::auth::session_user;
use super::validation::{require_id, require_self};
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserPairRequest};
use crate::services::{UserProfile, UserSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub is_following: bool,
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.accounts().get_profile(&id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// DELETE /users/{id}
/// Only the signed-in owner may delete an account.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let current = session_user(&session).await?;
    require_self(&current, &id)?;

    state.accounts().delete_account(&id).await?;
    let _ = session.flush().await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account deleted",
    ))))
}

/// POST /users/follow
pub async fn follow(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPairRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    let follower = require_id(&payload.user_id, "userId")?;
    let target = require_id(&payload.target_user_id, "targetUserId")?;

    state.social().follow(follower, target).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new("User followed"))),
    ))
}

/// DELETE /users/follow
pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPairRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let follower = require_id(&payload.user_id, "userId")?;
    let target = require_id(&payload.target_user_id, "targetUserId")?;

    state.social().unfollow(follower, target).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User unfollowed",
    ))))
}

/// GET /users/{id}/followers
pub async fn followers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.social().followers(&id).await?,
    )))
}

/// GET /users/{id}/following
pub async fn following(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    Ok(Json(ApiResponse::success(
        state.social().following(&id).await?,
    )))
}

/// GET /users/{id}/is-following/{other}
pub async fn is_following(
    State(state): State<Arc<AppState>>,
    Path((id, other)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FollowState>>, ApiError> {
    let is_following = state.social().is_following(&id, &other).await?;
    Ok(Json(ApiResponse::success(FollowState { is_following })))
}
