//! Domain service for events and participation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{EventRecord, EventUpdate, GalleryItem};
use crate::services::account_service::UserSummary;

#[derive(Debug, Error)]
pub enum EventError {
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

impl From<sea_orm::DbErr> for EventError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for EventError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub created_by: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub is_mature: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpload {
    pub user_id: String,
    pub url: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: EventRecord,
    pub creator: Option<UserSummary>,
    pub participant_count: u64,
}

#[async_trait::async_trait]
pub trait EventService: Send + Sync {
    /// # Errors
    ///
    /// Returns [`EventError::Forbidden`] when a public event is requested by a
    /// user whose parental controls restrict event creation.
    async fn create(&self, request: CreateEvent) -> Result<EventRecord, EventError>;

    async fn get(&self, event_id: &str) -> Result<EventDetails, EventError>;

    /// Creator only.
    async fn update(
        &self,
        event_id: &str,
        user_id: &str,
        update: EventUpdate,
    ) -> Result<EventRecord, EventError>;

    /// Creator only. Removes participants with the event.
    async fn delete(&self, event_id: &str, user_id: &str) -> Result<(), EventError>;

    /// Events visible to the viewer. Private events appear only for their
    /// creator and participants. Nothing from users they blocked, and no
    /// mature events when their content filter is on.
    async fn list(&self, viewer_id: Option<&str>) -> Result<Vec<EventRecord>, EventError>;

    async fn list_by_creator(&self, user_id: &str) -> Result<Vec<EventRecord>, EventError>;

    async fn list_joined(&self, user_id: &str) -> Result<Vec<EventRecord>, EventError>;

    async fn join(&self, event_id: &str, user_id: &str) -> Result<(), EventError>;

    async fn leave(&self, event_id: &str, user_id: &str) -> Result<(), EventError>;

    async fn participants(&self, event_id: &str) -> Result<Vec<UserSummary>, EventError>;

    /// Appends a media item. Only the creator and participants may add media.
    async fn add_gallery_item(
        &self,
        event_id: &str,
        upload: GalleryUpload,
    ) -> Result<Vec<GalleryItem>, EventError>;
}
