//! Parental-control endpoints.
//!
//! Every PIN-gated route goes through the attempt-limited gate in the
//! parental service. Failures answer 401 with the remaining attempts or the
//! lockout cooldown.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiQuery};
use super::validation::{require_field, require_id};
use super::{
    ApiError, ApiResponse, AppState, MessageResponse, NotifiedResponse, UserPinRequest,
};
use crate::db::{ParentalSettings, SettingsUpdate};
use crate::domain::PolicyDecision;
use crate::services::parental_service::RESET_REQUESTED_MESSAGE;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPinRequest {
    pub user_id: String,
    pub pin: String,
    pub confirm_pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    pub user_id: String,
    pub pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub user_id: String,
    pub pin: String,
    #[serde(default)]
    pub settings: SettingsUpdate,
}

#[derive(Debug, Deserialize)]
pub struct ResetPinRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResetRequest {
    pub token: String,
    pub new_pin: String,
    pub confirm_pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanMessageQuery {
    pub sender_id: String,
    pub recipient_id: String,
}

#[derive(Debug, Serialize)]
pub struct SetupPinResponse {
    pub message: String,
    pub settings: ParentalSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub verified: bool,
}

/// POST /parental-controls/setup-pin
pub async fn setup_pin(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SetupPinRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SetupPinResponse>>), ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;

    let outcome = state
        .parental()
        .setup_pin(user_id, &payload.pin, &payload.confirm_pin)
        .await?;

    let notified = NotifiedResponse::new("PIN set up successfully", &outcome.notification);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SetupPinResponse {
            message: notified.message,
            settings: outcome.settings,
            warning: notified.warning,
        })),
    ))
}

/// POST /parental-controls/verify-pin
pub async fn verify_pin(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPinRequest>,
) -> Result<Json<ApiResponse<VerifiedResponse>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    require_field(&payload.pin, "PIN")?;

    state.parental().verify_pin(user_id, &payload.pin).await?;
    Ok(Json(ApiResponse::success(VerifiedResponse { verified: true })))
}

/// GET /parental-controls/settings?userId=&pin=
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SettingsQuery>,
) -> Result<Json<ApiResponse<ParentalSettings>>, ApiError> {
    let user_id = require_id(&query.user_id, "userId")?;
    require_field(&query.pin, "PIN")?;

    let settings = state.parental().get_settings(user_id, &query.pin).await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// PUT /parental-controls/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<ParentalSettings>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    require_field(&payload.pin, "PIN")?;

    let settings = state
        .parental()
        .update_settings(user_id, &payload.pin, payload.settings)
        .await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// POST /parental-controls/reset-pin
/// Same answer whether or not the address belongs to a guardian.
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPinRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_field(&payload.email, "Email")?;
    state.parental().request_pin_reset(&payload.email).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        RESET_REQUESTED_MESSAGE,
    ))))
}

/// POST /parental-controls/complete-reset
pub async fn complete_reset(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CompleteResetRequest>,
) -> Result<Json<ApiResponse<NotifiedResponse>>, ApiError> {
    require_field(&payload.token, "Token")?;

    let outcome = state
        .parental()
        .complete_pin_reset(&payload.token, &payload.new_pin, &payload.confirm_pin)
        .await?;

    Ok(Json(ApiResponse::success(NotifiedResponse::new(
        "PIN has been reset successfully",
        &outcome.notification,
    ))))
}

/// POST /parental-controls/disable
pub async fn disable(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPinRequest>,
) -> Result<Json<ApiResponse<NotifiedResponse>>, ApiError> {
    let user_id = require_id(&payload.user_id, "userId")?;
    require_field(&payload.pin, "PIN")?;

    let notification = state.parental().disable(user_id, &payload.pin).await?;
    Ok(Json(ApiResponse::success(NotifiedResponse::new(
        "Parental controls disabled",
        &notification,
    ))))
}

/// GET /parental-controls/can-message?senderId=&recipientId=
pub async fn can_message(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<CanMessageQuery>,
) -> Result<Json<ApiResponse<PolicyDecision>>, ApiError> {
    let sender = require_id(&query.sender_id, "senderId")?;
    let recipient = require_id(&query.recipient_id, "recipientId")?;

    let decision = state.parental().can_send_message(sender, recipient).await?;
    Ok(Json(ApiResponse::success(decision)))
}
