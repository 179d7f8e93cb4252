//! `SeaORM` implementation of the `EventService` trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use url::Url;

use crate::db::{EventRecord, EventUpdate, GalleryItem, NewEvent, Store, timestamp};
use crate::services::account_service::UserSummary;
use crate::services::event_service::{
    CreateEvent, EventDetails, EventError, EventService, GalleryUpload,
};
use crate::services::parental_service::{ParentalError, ParentalService};

const MEDIA_TYPES: [&str; 2] = ["image", "video"];

impl From<ParentalError> for EventError {
    fn from(err: ParentalError) -> Self {
        Self::Internal(err.to_string())
    }
}

pub struct SeaOrmEventService {
    store: Store,
    parental: Arc<dyn ParentalService>,
}

impl SeaOrmEventService {
    #[must_use]
    pub fn new(store: Store, parental: Arc<dyn ParentalService>) -> Self {
        Self { store, parental }
    }

    async fn load(&self, event_id: &str) -> Result<EventRecord, EventError> {
        self.store
            .events()
            .get(event_id)
            .await?
            .ok_or_else(|| EventError::NotFound("Event not found".to_string()))
    }

    async fn ensure_public_allowed(&self, user_id: &str) -> Result<(), EventError> {
        let decision = self.parental.can_create_public_event(user_id).await?;
        if !decision.allowed {
            return Err(EventError::Forbidden(
                decision
                    .reason
                    .unwrap_or_else(|| "Public events are not allowed".to_string()),
            ));
        }
        Ok(())
    }
}

fn required(value: &str, field: &str) -> Result<String, EventError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EventError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_required(value: Option<String>, field: &str) -> Result<Option<String>, EventError> {
    value.map(|v| required(&v, field)).transpose()
}

#[async_trait]
impl EventService for SeaOrmEventService {
    async fn create(&self, request: CreateEvent) -> Result<EventRecord, EventError> {
        let title = required(&request.title, "Title")?;
        let date = required(&request.date, "Date")?;
        let time = required(&request.time, "Time")?;
        let location = required(&request.location, "Location")?;

        if self
            .store
            .users()
            .get_by_id(&request.created_by)
            .await?
            .is_none()
        {
            return Err(EventError::NotFound("User not found".to_string()));
        }

        if request.is_public {
            self.ensure_public_allowed(&request.created_by).await?;
        }

        let event = self
            .store
            .events()
            .create(NewEvent {
                title,
                description: request.description.trim().to_string(),
                date,
                time,
                location,
                is_public: request.is_public,
                is_mature: request.is_mature,
                created_by: request.created_by,
            })
            .await?;

        info!(event_id = %event.id, created_by = %event.created_by, "Event created");
        Ok(event)
    }

    async fn get(&self, event_id: &str) -> Result<EventDetails, EventError> {
        let event = self.load(event_id).await?;
        let creator = self
            .store
            .users()
            .get_by_id(&event.created_by)
            .await?
            .map(UserSummary::from);
        let participant_count = self.store.events().participant_count(event_id).await?;

        Ok(EventDetails {
            event,
            creator,
            participant_count,
        })
    }

    async fn update(
        &self,
        event_id: &str,
        user_id: &str,
        update: EventUpdate,
    ) -> Result<EventRecord, EventError> {
        let existing = self.load(event_id).await?;
        if existing.created_by != user_id {
            return Err(EventError::Forbidden(
                "Only the creator can edit this event".to_string(),
            ));
        }

        let update = EventUpdate {
            title: optional_required(update.title, "Title")?,
            date: optional_required(update.date, "Date")?,
            time: optional_required(update.time, "Time")?,
            location: optional_required(update.location, "Location")?,
            description: update.description.map(|d| d.trim().to_string()),
            ..update
        };

        if update.is_public == Some(true) && !existing.is_public {
            self.ensure_public_allowed(user_id).await?;
        }

        self.store
            .events()
            .update(event_id, update)
            .await?
            .ok_or_else(|| EventError::NotFound("Event not found".to_string()))
    }

    async fn delete(&self, event_id: &str, user_id: &str) -> Result<(), EventError> {
        let existing = self.load(event_id).await?;
        if existing.created_by != user_id {
            return Err(EventError::Forbidden(
                "Only the creator can delete this event".to_string(),
            ));
        }

        self.store.events().delete(event_id).await?;
        info!(event_id, "Event deleted");
        Ok(())
    }

    async fn list(&self, viewer_id: Option<&str>) -> Result<Vec<EventRecord>, EventError> {
        let Some(viewer_id) = viewer_id.filter(|v| !v.is_empty()) else {
            return Ok(self.store.events().list(None, &[], false).await?);
        };

        let blocked = self.store.social().blocked_ids(viewer_id).await?;
        let hide_mature = self.parental.should_filter_content(viewer_id, true).await?;

        Ok(self
            .store
            .events()
            .list(Some(viewer_id), &blocked, hide_mature)
            .await?)
    }

    async fn list_by_creator(&self, user_id: &str) -> Result<Vec<EventRecord>, EventError> {
        Ok(self.store.events().list_by_creator(user_id).await?)
    }

    async fn list_joined(&self, user_id: &str) -> Result<Vec<EventRecord>, EventError> {
        Ok(self.store.events().list_joined(user_id).await?)
    }

    async fn join(&self, event_id: &str, user_id: &str) -> Result<(), EventError> {
        let event = self.load(event_id).await?;

        if self.store.users().get_by_id(user_id).await?.is_none() {
            return Err(EventError::NotFound("User not found".to_string()));
        }
        if self
            .store
            .social()
            .is_blocked_either_way(&event.created_by, user_id)
            .await?
        {
            return Err(EventError::Forbidden(
                "You cannot join this event".to_string(),
            ));
        }
        if self
            .parental
            .should_filter_content(user_id, event.is_mature)
            .await?
        {
            return Err(EventError::Forbidden(
                "This event is restricted by parental controls".to_string(),
            ));
        }

        let events = self.store.events();
        if events.is_participant(event_id, user_id).await? {
            return Err(EventError::Conflict(
                "Already joined this event".to_string(),
            ));
        }

        events.join(event_id, user_id).await?;
        Ok(())
    }

    async fn leave(&self, event_id: &str, user_id: &str) -> Result<(), EventError> {
        if !self.store.events().leave(event_id, user_id).await? {
            return Err(EventError::NotFound(
                "Not a participant of this event".to_string(),
            ));
        }
        Ok(())
    }

    async fn participants(&self, event_id: &str) -> Result<Vec<UserSummary>, EventError> {
        self.load(event_id).await?;

        let ids = self.store.events().participant_ids(event_id).await?;
        let mut by_id: HashMap<String, UserSummary> = self
            .store
            .users()
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn add_gallery_item(
        &self,
        event_id: &str,
        upload: GalleryUpload,
    ) -> Result<Vec<GalleryItem>, EventError> {
        let media_type = upload.media_type.trim().to_lowercase();
        if !MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(EventError::Validation(
                "Media type must be image or video".to_string(),
            ));
        }

        let url = Url::parse(upload.url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| EventError::Validation("Invalid media URL".to_string()))?;

        let event = self.load(event_id).await?;
        if event.created_by != upload.user_id
            && !self
                .store
                .events()
                .is_participant(event_id, &upload.user_id)
                .await?
        {
            return Err(EventError::Forbidden(
                "Only the creator and participants can add media".to_string(),
            ));
        }

        self.store
            .events()
            .append_gallery(
                event_id,
                GalleryItem {
                    url: url.to_string(),
                    media_type,
                    uploaded_at: timestamp(Utc::now()),
                    uploaded_by: upload.user_id,
                },
            )
            .await?
            .ok_or_else(|| EventError::NotFound("Event not found".to_string()))
    }
}
