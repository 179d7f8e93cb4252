use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;

use crate::db::timestamp;
use crate::domain::{ReportReason, ReportStatus};
use crate::entities::prelude::*;
use crate::entities::reports;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub reporter_id: String,
    pub reported_user_id: Option<String>,
    pub reported_event_id: Option<String>,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl From<reports::Model> for ReportRecord {
    fn from(model: reports::Model) -> Self {
        Self {
            id: model.id,
            reporter_id: model.reporter_id,
            reported_user_id: model.reported_user_id,
            reported_event_id: model.reported_event_id,
            reason: model.reason,
            description: model.description,
            status: model.status,
            created_at: model.created_at,
            reviewed_at: model.reviewed_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub reporter_id: String,
    pub reported_user_id: Option<String>,
    pub reported_event_id: Option<String>,
    pub reason: ReportReason,
    pub description: Option<String>,
}

pub struct ModerationRepository {
    conn: DatabaseConnection,
}

impl ModerationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create_report(&self, report: NewReport) -> Result<ReportRecord> {
        let model = reports::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            reporter_id: Set(report.reporter_id),
            reported_user_id: Set(report.reported_user_id),
            reported_event_id: Set(report.reported_event_id),
            reason: Set(report.reason.as_str().to_string()),
            description: Set(report.description),
            status: Set(ReportStatus::Pending.as_str().to_string()),
            created_at: Set(timestamp(Utc::now())),
            reviewed_at: Set(None),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert report")?;

        Ok(ReportRecord::from(model))
    }

    /// Whether the reporter already filed a report against the same target.
    pub async fn report_exists(
        &self,
        reporter_id: &str,
        reported_user_id: Option<&str>,
        reported_event_id: Option<&str>,
    ) -> Result<bool> {
        let mut query = Reports::find().filter(reports::Column::ReporterId.eq(reporter_id));

        query = match reported_user_id {
            Some(id) => query.filter(reports::Column::ReportedUserId.eq(id)),
            None => query.filter(reports::Column::ReportedUserId.is_null()),
        };
        query = match reported_event_id {
            Some(id) => query.filter(reports::Column::ReportedEventId.eq(id)),
            None => query.filter(reports::Column::ReportedEventId.is_null()),
        };

        Ok(query.count(&self.conn).await? > 0)
    }

    pub async fn list_by_reporter(&self, reporter_id: &str) -> Result<Vec<ReportRecord>> {
        let rows = Reports::find()
            .filter(reports::Column::ReporterId.eq(reporter_id))
            .order_by_desc(reports::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list reports by reporter")?;

        Ok(rows.into_iter().map(ReportRecord::from).collect())
    }

    pub async fn list_by_status(&self, status: ReportStatus) -> Result<Vec<ReportRecord>> {
        let rows = Reports::find()
            .filter(reports::Column::Status.eq(status.as_str()))
            .order_by_desc(reports::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list reports by status")?;

        Ok(rows.into_iter().map(ReportRecord::from).collect())
    }
}
