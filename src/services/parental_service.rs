//! Domain service for parental controls.
//!
//! Covers PIN setup, the attempt-limited PIN gate, emailed PIN resets, disabling
//! controls, the minor-to-adult transition and the policy checks other services
//! consult before acting on behalf of a minor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::{ParentalSettings, SettingsUpdate};
use crate::domain::{AgeCategory, PolicyDecision};
use crate::services::notifications::Notified;

/// Returned by a reset request whether or not the address is on file.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If this email is registered as a guardian email, a PIN reset link has been sent.";

/// Errors specific to parental-control operations.
#[derive(Debug, Error)]
pub enum ParentalError {
    #[error("{0}")]
    Validation(String),

    #[error("Incorrect PIN")]
    InvalidPin { attempts_remaining: u32 },

    #[error("Too many failed attempts. Try again in {retry_after_seconds} seconds")]
    LockedOut {
        locked_until: DateTime<Utc>,
        retry_after_seconds: i64,
    },

    #[error("{0}")]
    InvalidToken(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ParentalError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ParentalError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupOutcome {
    pub settings: ParentalSettings,
    pub notification: Notified,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOutcome {
    pub user_id: String,
    pub notification: Notified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeTransition {
    pub transitioned: bool,
    pub age_category: AgeCategory,
}

/// Domain service trait for parental controls.
#[async_trait::async_trait]
pub trait ParentalService: Send + Sync {
    /// Stores a hashed PIN with all restrictions enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ParentalError::Validation`] on a malformed or mismatched PIN,
    /// or when a PIN is already configured.
    async fn setup_pin(
        &self,
        user_id: &str,
        pin: &str,
        confirm_pin: &str,
    ) -> Result<SetupOutcome, ParentalError>;

    /// Runs the attempt-limited gate.
    ///
    /// # Errors
    ///
    /// Returns [`ParentalError::LockedOut`] while a lockout is active (even for
    /// the correct PIN) and [`ParentalError::InvalidPin`] on a mismatch.
    async fn verify_pin(&self, user_id: &str, pin: &str) -> Result<(), ParentalError>;

    async fn get_settings(&self, user_id: &str, pin: &str)
    -> Result<ParentalSettings, ParentalError>;

    async fn update_settings(
        &self,
        user_id: &str,
        pin: &str,
        update: SettingsUpdate,
    ) -> Result<ParentalSettings, ParentalError>;

    /// Emails a reset link to the guardian if the address belongs to a minor
    /// with controls. Gives no indication of whether it did.
    async fn request_pin_reset(&self, guardian_email: &str) -> Result<(), ParentalError>;

    /// # Errors
    ///
    /// Returns [`ParentalError::InvalidToken`] if the token is unknown, expired
    /// or used, before any PIN validation.
    async fn complete_pin_reset(
        &self,
        token: &str,
        new_pin: &str,
        confirm_pin: &str,
    ) -> Result<ResetOutcome, ParentalError>;

    /// Removes all parental rows and marks the user adult, after the PIN gate.
    async fn disable(&self, user_id: &str, pin: &str) -> Result<Notified, ParentalError>;

    /// Promotes a minor who has reached the age of majority. Safe to call on
    /// every login.
    async fn check_age_transition(&self, user_id: &str) -> Result<AgeTransition, ParentalError>;

    async fn can_send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<PolicyDecision, ParentalError>;

    async fn can_create_public_event(&self, user_id: &str)
    -> Result<PolicyDecision, ParentalError>;

    /// Whether an event should be hidden from this user.
    async fn should_filter_content(
        &self,
        user_id: &str,
        event_is_mature: bool,
    ) -> Result<bool, ParentalError>;
}
