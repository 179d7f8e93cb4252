use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiQuery};
use super::validation::require_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserPairRequest};
use crate::db::ReportRecord;
use crate::services::social_service::ReportRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedList {
    pub blocked_user_ids: Vec<String>,
}

/// POST /moderation/block
pub async fn block(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPairRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageResponse>>), ApiError> {
    let blocker = require_id(&payload.user_id, "userId")?;
    let blocked = require_id(&payload.target_user_id, "targetUserId")?;

    state.moderation().block(blocker, blocked).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MessageResponse::new("User blocked"))),
    ))
}

/// DELETE /moderation/block
pub async fn unblock(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UserPairRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let blocker = require_id(&payload.user_id, "userId")?;
    let blocked = require_id(&payload.target_user_id, "targetUserId")?;

    state.moderation().unblock(blocker, blocked).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User unblocked",
    ))))
}

/// GET /moderation/block?userId=
pub async fn blocked(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<BlockedQuery>,
) -> Result<Json<ApiResponse<BlockedList>>, ApiError> {
    let user_id = require_id(&query.user_id, "userId")?;
    let blocked_user_ids = state.moderation().blocked_ids(user_id).await?;
    Ok(Json(ApiResponse::success(BlockedList { blocked_user_ids })))
}

/// POST /moderation/report
pub async fn report(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ReportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReportRecord>>), ApiError> {
    require_id(&payload.reporter_id, "reporterId")?;
    let record = state.moderation().report(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// GET /moderation/report?reporterId= or ?status=
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<ApiResponse<Vec<ReportRecord>>>, ApiError> {
    let reports = match (query.reporter_id, query.status) {
        (Some(reporter), None) => {
            let reporter = require_id(&reporter, "reporterId")?;
            state.moderation().reports_by_reporter(reporter).await?
        }
        (None, Some(status)) => state.moderation().reports_by_status(&status).await?,
        _ => {
            return Err(ApiError::validation(
                "Provide exactly one of reporterId or status",
            ));
        }
    };
    Ok(Json(ApiResponse::success(reports)))
}
