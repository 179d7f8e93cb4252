use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::extract::{ApiJson, ApiQuery};
use super::validation::require_field;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::account_service::{PASSWORD_RESET_MESSAGE, Registration};
use crate::services::{LoginOutcome, UserProfile};

pub const SESSION_USER_KEY: &str = "user_id";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Serialize)]
pub struct TokenValidity {
    pub valid: bool,
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    let profile = state.accounts().register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

/// POST /auth/login
/// Runs the age-transition check before answering, so a minor who has come of
/// age logs in as an adult.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginOutcome>>, ApiError> {
    require_field(&payload.email, "Email")?;
    require_field(&payload.password, "Password")?;

    let outcome = state
        .accounts()
        .login(&payload.email, &payload.password)
        .await?;

    session.cycle_id().await.map_err(|e| {
        ApiError::internal(format!("Failed to rotate session: {e}"))
    })?;
    session
        .insert(SESSION_USER_KEY, &outcome.user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user_id = session_user(&session).await?;
    let profile = state.accounts().get_profile(&user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /auth/forgot-password
/// Same answer whether or not the account exists.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_field(&payload.email, "Email")?;
    state
        .accounts()
        .request_password_reset(&payload.email)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        PASSWORD_RESET_MESSAGE,
    ))))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_field(&payload.token, "Token")?;
    state
        .accounts()
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset successfully",
    ))))
}

/// GET /auth/reset-password?token=
pub async fn validate_reset_token(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Json<ApiResponse<TokenValidity>>, ApiError> {
    let valid = state.accounts().validate_reset_token(&query.token).await?;
    Ok(Json(ApiResponse::success(TokenValidity { valid })))
}

/// User id from the session, or 401.
pub async fn session_user(session: &Session) -> Result<String, ApiError> {
    let user_id = session
        .get::<String>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    tracing::Span::current().record("user_id", user_id.as_str());
    Ok(user_id)
}
