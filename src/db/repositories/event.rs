use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Query,
};
use serde::{Deserialize, Serialize};

use crate::db::timestamp;
use crate::entities::prelude::*;
use crate::entities::{event_participants, events, reports};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub url: String,
    pub media_type: String,
    pub uploaded_at: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub is_public: bool,
    pub is_mature: bool,
    pub media_gallery: Vec<GalleryItem>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<events::Model> for EventRecord {
    fn from(model: events::Model) -> Self {
        Self {
            media_gallery: parse_gallery(&model.media_gallery),
            id: model.id,
            title: model.title,
            description: model.description,
            date: model.date,
            time: model.time,
            location: model.location,
            is_public: model.is_public,
            is_mature: model.is_mature,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn parse_gallery(raw: &str) -> Vec<GalleryItem> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding malformed media gallery");
        Vec::new()
    })
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub is_public: bool,
    pub is_mature: bool,
    pub created_by: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub is_public: Option<bool>,
    pub is_mature: Option<bool>,
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, event: NewEvent) -> Result<EventRecord> {
        let now = timestamp(Utc::now());

        let model = events::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            title: Set(event.title),
            description: Set(event.description),
            date: Set(event.date),
            time: Set(event.time),
            location: Set(event.location),
            is_public: Set(event.is_public),
            is_mature: Set(event.is_mature),
            media_gallery: Set("[]".to_string()),
            created_by: Set(event.created_by),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert event")?;

        Ok(EventRecord::from(model))
    }

    pub async fn get(&self, id: &str) -> Result<Option<EventRecord>> {
        let event = Events::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query event")?;
        Ok(event.map(EventRecord::from))
    }

    pub async fn update(&self, id: &str, update: EventUpdate) -> Result<Option<EventRecord>> {
        let Some(existing) = Events::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: events::ActiveModel = existing.into();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(date) = update.date {
            active.date = Set(date);
        }
        if let Some(time) = update.time {
            active.time = Set(time);
        }
        if let Some(location) = update.location {
            active.location = Set(location);
        }
        if let Some(is_public) = update.is_public {
            active.is_public = Set(is_public);
        }
        if let Some(is_mature) = update.is_mature {
            active.is_mature = Set(is_mature);
        }
        active.updated_at = Set(timestamp(Utc::now()));

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update event")?;
        Ok(Some(EventRecord::from(model)))
    }

    /// Deletes the event with its participants and any reports against it.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        EventParticipants::delete_many()
            .filter(event_participants::Column::EventId.eq(id))
            .exec(&txn)
            .await?;
        Reports::delete_many()
            .filter(reports::Column::ReportedEventId.eq(id))
            .exec(&txn)
            .await?;
        let result = Events::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Events visible to `viewer`, newest first. Private events only show up
    /// for their creator and participants; anonymous listings get public
    /// events only. Events created by `excluded_creators` are dropped, and
    /// mature events too when `hide_mature` is set.
    pub async fn list(
        &self,
        viewer: Option<&str>,
        excluded_creators: &[String],
        hide_mature: bool,
    ) -> Result<Vec<EventRecord>> {
        let mut visible = Condition::any().add(events::Column::IsPublic.eq(true));
        if let Some(viewer) = viewer {
            visible = visible
                .add(events::Column::CreatedBy.eq(viewer))
                .add(
                    events::Column::Id.in_subquery(
                        Query::select()
                            .column(event_participants::Column::EventId)
                            .from(EventParticipants)
                            .and_where(event_participants::Column::UserId.eq(viewer))
                            .to_owned(),
                    ),
                );
        }

        let mut query = Events::find().filter(visible);
        if !excluded_creators.is_empty() {
            query = query.filter(events::Column::CreatedBy.is_not_in(excluded_creators.iter().cloned()));
        }
        if hide_mature {
            query = query.filter(events::Column::IsMature.eq(false));
        }

        let rows = query
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list events")?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    pub async fn list_by_creator(&self, user_id: &str) -> Result<Vec<EventRecord>> {
        let rows = Events::find()
            .filter(events::Column::CreatedBy.eq(user_id))
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list events by creator")?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    pub async fn list_joined(&self, user_id: &str) -> Result<Vec<EventRecord>> {
        let event_ids: Vec<String> = EventParticipants::find()
            .select_only()
            .column(event_participants::Column::EventId)
            .filter(event_participants::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        if event_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = Events::find()
            .filter(events::Column::Id.is_in(event_ids))
            .order_by_asc(events::Column::Date)
            .all(&self.conn)
            .await
            .context("Failed to list joined events")?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    pub async fn is_participant(&self, event_id: &str, user_id: &str) -> Result<bool> {
        let count = EventParticipants::find()
            .filter(event_participants::Column::EventId.eq(event_id))
            .filter(event_participants::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn join(&self, event_id: &str, user_id: &str) -> Result<()> {
        EventParticipants::insert(event_participants::ActiveModel {
            event_id: Set(event_id.to_string()),
            user_id: Set(user_id.to_string()),
            joined_at: Set(timestamp(Utc::now())),
        })
        .exec_without_returning(&self.conn)
        .await
        .context("Failed to insert participant")?;
        Ok(())
    }

    pub async fn leave(&self, event_id: &str, user_id: &str) -> Result<bool> {
        let result = EventParticipants::delete_many()
            .filter(event_participants::Column::EventId.eq(event_id))
            .filter(event_participants::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Participant user ids in join order.
    pub async fn participant_ids(&self, event_id: &str) -> Result<Vec<String>> {
        let ids = EventParticipants::find()
            .select_only()
            .column(event_participants::Column::UserId)
            .filter(event_participants::Column::EventId.eq(event_id))
            .order_by_asc(event_participants::Column::JoinedAt)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list participants")?;
        Ok(ids)
    }

    pub async fn participant_count(&self, event_id: &str) -> Result<u64> {
        let count = EventParticipants::find()
            .filter(event_participants::Column::EventId.eq(event_id))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    /// Appends to the gallery inside a transaction so concurrent uploads are
    /// not lost. Returns the updated gallery, or `None` if the event is gone.
    pub async fn append_gallery(
        &self,
        event_id: &str,
        item: GalleryItem,
    ) -> Result<Option<Vec<GalleryItem>>> {
        let txn = self.conn.begin().await?;

        let Some(existing) = Events::find_by_id(event_id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut gallery = parse_gallery(&existing.media_gallery);
        gallery.push(item);
        let encoded = serde_json::to_string(&gallery)?;

        let mut active: events::ActiveModel = existing.into();
        active.media_gallery = Set(encoded);
        active.updated_at = Set(timestamp(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(Some(gallery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gallery_tolerates_garbage() {
        assert!(parse_gallery("not json").is_empty());
        assert!(parse_gallery("[]").is_empty());

        let raw = r#"[{"url":"https://cdn/x.jpg","mediaType":"image","uploadedAt":"2026-01-01T00:00:00Z","uploadedBy":"u1"}]"#;
        let items = parse_gallery(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].media_type, "image");
    }
}
