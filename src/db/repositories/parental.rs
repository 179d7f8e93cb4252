use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};

use crate::db::{parse_timestamp, timestamp};
use crate::domain::AgeCategory;
use crate::domain::pin::{AttemptState, Claim, PinPolicy};
use crate::entities::prelude::*;
use crate::entities::{parental_controls, pin_attempts, pin_reset_tokens, users};

/// Restriction flags, without the PIN hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalSettings {
    pub messaging_restricted: bool,
    pub event_creation_restricted: bool,
    pub content_filtering_enabled: bool,
    pub notifications_enabled: bool,
}

impl Default for ParentalSettings {
    fn default() -> Self {
        Self {
            messaging_restricted: true,
            event_creation_restricted: true,
            content_filtering_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl From<&parental_controls::Model> for ParentalSettings {
    fn from(model: &parental_controls::Model) -> Self {
        Self {
            messaging_restricted: model.messaging_restricted,
            event_creation_restricted: model.event_creation_restricted,
            content_filtering_enabled: model.content_filtering_enabled,
            notifications_enabled: model.notifications_enabled,
        }
    }
}

/// Partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub messaging_restricted: Option<bool>,
    pub event_creation_restricted: Option<bool>,
    pub content_filtering_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
}

impl SettingsUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messaging_restricted.is_none()
            && self.event_creation_restricted.is_none()
            && self.content_filtering_enabled.is_none()
            && self.notifications_enabled.is_none()
    }
}

/// Stored reset token, as needed to decide whether it can be redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub used: bool,
}

impl ResetToken {
    /// Usable when unused and not yet expired. Unparseable expiry counts as
    /// expired.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at.is_some_and(|at| at > now)
    }
}

impl From<pin_reset_tokens::Model> for ResetToken {
    fn from(model: pin_reset_tokens::Model) -> Self {
        Self {
            expires_at: parse_timestamp(&model.expires_at),
            used: model.used_at.is_some(),
            token: model.token,
            user_id: model.user_id,
        }
    }
}

pub struct ParentalRepository {
    conn: DatabaseConnection,
}

impl ParentalRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns `(pin_hash, settings)` for the user, if controls are configured.
    pub async fn get_controls(&self, user_id: &str) -> Result<Option<(String, ParentalSettings)>> {
        let row = ParentalControls::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query parental controls")?;

        Ok(row.map(|r| {
            let settings = ParentalSettings::from(&r);
            (r.pin_hash, settings)
        }))
    }

    pub async fn get_settings(&self, user_id: &str) -> Result<Option<ParentalSettings>> {
        Ok(self.get_controls(user_id).await?.map(|(_, s)| s))
    }

    pub async fn create_controls(&self, user_id: &str, pin_hash: &str) -> Result<ParentalSettings> {
        let now = timestamp(Utc::now());
        let defaults = ParentalSettings::default();

        let model = parental_controls::ActiveModel {
            user_id: Set(user_id.to_string()),
            pin_hash: Set(pin_hash.to_string()),
            messaging_restricted: Set(defaults.messaging_restricted),
            event_creation_restricted: Set(defaults.event_creation_restricted),
            content_filtering_enabled: Set(defaults.content_filtering_enabled),
            notifications_enabled: Set(defaults.notifications_enabled),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert parental controls")?;

        Ok(ParentalSettings::from(&model))
    }

    /// Applies the provided flags and returns the resulting settings, or
    /// `None` if the user has no controls.
    pub async fn update_settings(
        &self,
        user_id: &str,
        update: SettingsUpdate,
    ) -> Result<Option<ParentalSettings>> {
        let Some(existing) = ParentalControls::find_by_id(user_id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        if update.is_empty() {
            return Ok(Some(ParentalSettings::from(&existing)));
        }

        let mut active: parental_controls::ActiveModel = existing.into();
        if let Some(value) = update.messaging_restricted {
            active.messaging_restricted = Set(value);
        }
        if let Some(value) = update.event_creation_restricted {
            active.event_creation_restricted = Set(value);
        }
        if let Some(value) = update.content_filtering_enabled {
            active.content_filtering_enabled = Set(value);
        }
        if let Some(value) = update.notifications_enabled {
            active.notifications_enabled = Set(value);
        }
        active.updated_at = Set(timestamp(Utc::now()));

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update parental settings")?;

        Ok(Some(ParentalSettings::from(&model)))
    }

    pub async fn get_attempts(&self, user_id: &str) -> Result<AttemptState> {
        let row = PinAttempts::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query PIN attempts")?;

        Ok(row.map_or_else(AttemptState::default, attempt_state))
    }

    /// Charges one PIN attempt for the user. The opening upsert takes the
    /// write lock, so the read and write that follow see no interleaved
    /// attempts.
    pub async fn claim_attempt(
        &self,
        user_id: &str,
        policy: &PinPolicy,
        now: DateTime<Utc>,
    ) -> Result<Claim> {
        let txn = self.conn.begin().await?;

        PinAttempts::insert(pin_attempts::ActiveModel {
            user_id: Set(user_id.to_string()),
            attempt_count: Set(0),
            locked_until: Set(None),
            last_attempt_at: Set(timestamp(now)),
        })
        .on_conflict(
            OnConflict::column(pin_attempts::Column::UserId)
                .update_column(pin_attempts::Column::LastAttemptAt)
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .context("Failed to record PIN attempt")?;

        let state = PinAttempts::find_by_id(user_id)
            .one(&txn)
            .await?
            .map(attempt_state)
            .context("PIN attempt row missing after upsert")?;

        let claim = policy.claim(&state, now);
        if let Claim::Granted(charged) = &claim {
            PinAttempts::update_many()
                .col_expr(
                    pin_attempts::Column::AttemptCount,
                    Expr::value(i32::try_from(charged.count).unwrap_or(i32::MAX)),
                )
                .col_expr(
                    pin_attempts::Column::LockedUntil,
                    Expr::value(charged.locked_until.map(timestamp)),
                )
                .filter(pin_attempts::Column::UserId.eq(user_id))
                .exec(&txn)
                .await
                .context("Failed to charge PIN attempt")?;
        }

        txn.commit().await?;
        Ok(claim)
    }

    /// Clears the counter and any lockout after a successful verification.
    pub async fn reset_attempts(&self, user_id: &str) -> Result<()> {
        reset_attempts_on(&self.conn, user_id).await
    }

    pub async fn create_reset_token(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        pin_reset_tokens::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id.to_string()),
            expires_at: Set(timestamp(expires_at)),
            used_at: Set(None),
            created_at: Set(timestamp(Utc::now())),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert PIN reset token")?;

        Ok(())
    }

    pub async fn find_reset_token(&self, token: &str) -> Result<Option<ResetToken>> {
        let row = PinResetTokens::find_by_id(token)
            .one(&self.conn)
            .await
            .context("Failed to query PIN reset token")?;

        Ok(row.map(ResetToken::from))
    }

    /// Redeems a reset token: new PIN hash, token marked used, attempts
    /// cleared. Returns false if the token was consumed concurrently or the
    /// user's controls were removed in the meantime.
    pub async fn complete_reset(
        &self,
        token: &str,
        user_id: &str,
        pin_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;
        let now_str = timestamp(now);

        let marked = PinResetTokens::update_many()
            .col_expr(pin_reset_tokens::Column::UsedAt, Expr::value(now_str.clone()))
            .filter(pin_reset_tokens::Column::Token.eq(token))
            .filter(pin_reset_tokens::Column::UsedAt.is_null())
            .exec(&txn)
            .await?;

        if marked.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let updated = ParentalControls::update_many()
            .col_expr(parental_controls::Column::PinHash, Expr::value(pin_hash))
            .col_expr(parental_controls::Column::UpdatedAt, Expr::value(now_str))
            .filter(parental_controls::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        reset_attempts_on(&txn, user_id).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Deletes controls, attempts and reset tokens and marks the user adult,
    /// atomically.
    pub async fn remove_controls_and_promote(&self, user_id: &str) -> Result<()> {
        let txn = self.conn.begin().await?;
        remove_parental_rows(&txn, user_id).await?;
        set_adult(&txn, user_id, None).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Promotes a minor to adult and removes their parental rows. The update
    /// only applies while the stored category is still minor, so concurrent
    /// logins transition at most once. Returns whether this call did it.
    pub async fn transition_to_adult(&self, user_id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let promoted = set_adult(&txn, user_id, Some(AgeCategory::Minor)).await?;
        if !promoted {
            txn.rollback().await?;
            return Ok(false);
        }

        remove_parental_rows(&txn, user_id).await?;
        txn.commit().await?;
        Ok(true)
    }

    /// Deletes tokens that are expired or already used.
    pub async fn purge_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = PinResetTokens::delete_many()
            .filter(
                Condition::any()
                    .add(pin_reset_tokens::Column::ExpiresAt.lte(timestamp(now)))
                    .add(pin_reset_tokens::Column::UsedAt.is_not_null()),
            )
            .exec(&self.conn)
            .await
            .context("Failed to purge PIN reset tokens")?;

        Ok(result.rows_affected)
    }
}

fn attempt_state(row: pin_attempts::Model) -> AttemptState {
    AttemptState {
        count: u32::try_from(row.attempt_count).unwrap_or(0),
        locked_until: row.locked_until.as_deref().and_then(parse_timestamp),
    }
}

async fn reset_attempts_on<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<()> {
    PinAttempts::update_many()
        .col_expr(pin_attempts::Column::AttemptCount, Expr::value(0))
        .col_expr(
            pin_attempts::Column::LockedUntil,
            Expr::value(Option::<String>::None),
        )
        .filter(pin_attempts::Column::UserId.eq(user_id))
        .exec(conn)
        .await
        .context("Failed to reset PIN attempts")?;
    Ok(())
}

async fn remove_parental_rows<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<()> {
    ParentalControls::delete_many()
        .filter(parental_controls::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    PinAttempts::delete_many()
        .filter(pin_attempts::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    PinResetTokens::delete_many()
        .filter(pin_reset_tokens::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

async fn set_adult<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    only_if: Option<AgeCategory>,
) -> Result<bool> {
    let mut query = Users::update_many()
        .col_expr(
            users::Column::AgeCategory,
            Expr::value(AgeCategory::Adult.as_str()),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(timestamp(Utc::now())))
        .filter(users::Column::Id.eq(user_id));

    if let Some(category) = only_if {
        query = query.filter(users::Column::AgeCategory.eq(category.as_str()));
    }

    let result = query.exec(conn).await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reset_token_redeemable() {
        let now = Utc::now();
        let mut token = ResetToken {
            token: "abc".to_string(),
            user_id: "u".to_string(),
            expires_at: Some(now + Duration::hours(1)),
            used: false,
        };
        assert!(token.is_redeemable(now));

        token.used = true;
        assert!(!token.is_redeemable(now));

        token.used = false;
        token.expires_at = Some(now - Duration::seconds(1));
        assert!(!token.is_redeemable(now));

        token.expires_at = None;
        assert!(!token.is_redeemable(now));
    }

    #[test]
    fn test_settings_update_is_empty() {
        assert!(SettingsUpdate::default().is_empty());
        let update = SettingsUpdate {
            notifications_enabled: Some(false),
            ..SettingsUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
