//! `SeaORM` implementation of `SocialService` and `ModerationService`.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewReport, ReportRecord, Store};
use crate::domain::{ReportReason, ReportStatus};
use crate::services::account_service::UserSummary;
use crate::services::social_service::{
    ModerationService, ReportRequest, SocialError, SocialService,
};

const MAX_REPORT_DESCRIPTION: usize = 1000;

pub struct SeaOrmSocialService {
    store: Store,
}

impl SeaOrmSocialService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn ensure_user(&self, user_id: &str) -> Result<(), SocialError> {
        if self.store.users().get_by_id(user_id).await?.is_none() {
            return Err(SocialError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Loads users keeping the order of `ids`. Ids without a user are dropped.
    async fn summaries(&self, ids: Vec<String>) -> Result<Vec<UserSummary>, SocialError> {
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
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl SocialService for SeaOrmSocialService {
    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<(), SocialError> {
        if follower_id == following_id {
            return Err(SocialError::Validation(
                "You cannot follow yourself".to_string(),
            ));
        }

        self.ensure_user(follower_id).await?;
        self.ensure_user(following_id).await?;

        let social = self.store.social();
        if social
            .is_blocked_either_way(follower_id, following_id)
            .await?
        {
            return Err(SocialError::Forbidden(
                "You cannot follow this user".to_string(),
            ));
        }
        if social.is_following(follower_id, following_id).await? {
            return Err(SocialError::Conflict(
                "Already following this user".to_string(),
            ));
        }

        social.follow(follower_id, following_id).await?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<(), SocialError> {
        if !self
            .store
            .social()
            .unfollow(follower_id, following_id)
            .await?
        {
            return Err(SocialError::NotFound(
                "Not following this user".to_string(),
            ));
        }
        Ok(())
    }

    async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, SocialError> {
        Ok(self
            .store
            .social()
            .is_following(follower_id, following_id)
            .await?)
    }

    async fn followers(&self, user_id: &str) -> Result<Vec<UserSummary>, SocialError> {
        self.ensure_user(user_id).await?;
        let ids = self.store.social().follower_ids(user_id).await?;
        self.summaries(ids).await
    }

    async fn following(&self, user_id: &str) -> Result<Vec<UserSummary>, SocialError> {
        self.ensure_user(user_id).await?;
        let ids = self.store.social().following_ids(user_id).await?;
        self.summaries(ids).await
    }
}

#[async_trait]
impl ModerationService for SeaOrmSocialService {
    async fn block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), SocialError> {
        if blocker_id == blocked_id {
            return Err(SocialError::Validation(
                "You cannot block yourself".to_string(),
            ));
        }

        self.ensure_user(blocker_id).await?;
        self.ensure_user(blocked_id).await?;

        let social = self.store.social();
        if social.has_blocked(blocker_id, blocked_id).await? {
            return Err(SocialError::Conflict("User already blocked".to_string()));
        }

        social.block(blocker_id, blocked_id).await?;
        info!(blocker_id, blocked_id, "User blocked");
        Ok(())
    }

    async fn unblock(&self, blocker_id: &str, blocked_id: &str) -> Result<(), SocialError> {
        if !self.store.social().unblock(blocker_id, blocked_id).await? {
            return Err(SocialError::NotFound("User is not blocked".to_string()));
        }
        Ok(())
    }

    async fn blocked_ids(&self, blocker_id: &str) -> Result<Vec<String>, SocialError> {
        Ok(self.store.social().blocked_ids(blocker_id).await?)
    }

    async fn report(&self, request: ReportRequest) -> Result<ReportRecord, SocialError> {
        let reported_user = non_empty(request.reported_user_id.as_deref());
        let reported_event = non_empty(request.reported_event_id.as_deref());

        if reported_user.is_some() == reported_event.is_some() {
            return Err(SocialError::Validation(
                "Exactly one of reportedUserId or reportedEventId is required".to_string(),
            ));
        }

        let reason: ReportReason = request
            .reason
            .trim()
            .parse()
            .map_err(SocialError::Validation)?;

        let description = non_empty(request.description.as_deref()).map(str::to_string);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_REPORT_DESCRIPTION)
        {
            return Err(SocialError::Validation(format!(
                "Description must be {MAX_REPORT_DESCRIPTION} characters or less"
            )));
        }

        self.ensure_user(&request.reporter_id).await?;

        if let Some(user_id) = reported_user {
            if user_id == request.reporter_id {
                return Err(SocialError::Validation(
                    "You cannot report yourself".to_string(),
                ));
            }
            self.ensure_user(user_id).await?;
        }
        if let Some(event_id) = reported_event
            && self.store.events().get(event_id).await?.is_none()
        {
            return Err(SocialError::NotFound("Event not found".to_string()));
        }

        let moderation = self.store.moderation();
        if moderation
            .report_exists(&request.reporter_id, reported_user, reported_event)
            .await?
        {
            return Err(SocialError::Conflict(
                "You have already reported this".to_string(),
            ));
        }

        let record = moderation
            .create_report(NewReport {
                reporter_id: request.reporter_id.clone(),
                reported_user_id: reported_user.map(str::to_string),
                reported_event_id: reported_event.map(str::to_string),
                reason,
                description,
            })
            .await?;

        info!(report_id = %record.id, reason = reason.as_str(), "Report filed");
        Ok(record)
    }

    async fn reports_by_reporter(
        &self,
        reporter_id: &str,
    ) -> Result<Vec<ReportRecord>, SocialError> {
        Ok(self.store.moderation().list_by_reporter(reporter_id).await?)
    }

    async fn reports_by_status(&self, status: &str) -> Result<Vec<ReportRecord>, SocialError> {
        let status: ReportStatus = status.parse().map_err(SocialError::Validation)?;
        Ok(self.store.moderation().list_by_status(status).await?)
    }
}
