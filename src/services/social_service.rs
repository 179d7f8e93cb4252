//! Domain services for the follow graph and for moderation (blocks and
//! reports).

use serde::Deserialize;
use thiserror::Error;

use crate::db::ReportRecord;
use crate::services::account_service::UserSummary;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SocialError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SocialError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub reporter_id: String,
    #[serde(default)]
    pub reported_user_id: Option<String>,
    #[serde(default)]
    pub reported_event_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[async_trait::async_trait]
pub trait SocialService: Send + Sync {
    /// # Errors
    ///
    /// Fails for self-follows, when either user blocked the other, and with
    /// [`SocialError::Conflict`] if the edge already exists.
    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<(), SocialError>;

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<(), SocialError>;

    async fn is_following(&self, follower_id: &str, following_id: &str)
    -> Result<bool, SocialError>;

    async fn followers(&self, user_id: &str) -> Result<Vec<UserSummary>, SocialError>;

    async fn following(&self, user_id: &str) -> Result<Vec<UserSummary>, SocialError>;
}

#[async_trait::async_trait]
pub trait ModerationService: Send + Sync {
    /// Blocks a user and removes follow edges in both directions.
    async fn block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), SocialError>;

    async fn unblock(&self, blocker_id: &str, blocked_id: &str) -> Result<(), SocialError>;

    async fn blocked_ids(&self, blocker_id: &str) -> Result<Vec<String>, SocialError>;

    /// Files a report against exactly one user or event.
    async fn report(&self, request: ReportRequest) -> Result<ReportRecord, SocialError>;

    async fn reports_by_reporter(&self, reporter_id: &str)
    -> Result<Vec<ReportRecord>, SocialError>;

    async fn reports_by_status(&self, status: &str) -> Result<Vec<ReportRecord>, SocialError>;
}
