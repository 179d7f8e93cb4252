//! Domain service for accounts.
//!
//! Registration with age classification, login, password resets and account
//! deletion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::User;
use crate::domain::AgeCategory;

/// Returned by a password reset request whether or not the account exists.
pub const PASSWORD_RESET_MESSAGE: &str =
    "If an account exists with this email, a password reset link has been sent.";

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub guardian_email: Option<String>,
}

/// Account as shown to its owner and on profile pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub date_of_birth: Option<String>,
    pub age_category: AgeCategory,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub followers_count: u64,
    pub following_count: u64,
}

impl UserProfile {
    #[must_use]
    pub fn new(user: User, followers_count: u64, following_count: u64) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            date_of_birth: user.date_of_birth,
            age_category: user.age_category,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
            followers_count,
            following_count,
        }
    }
}

/// Minimal user reference for follower and participant lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            profile_picture: user.profile_picture,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub age_transitioned: bool,
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for malformed input, under-age or
    /// future dates of birth, and minors without a guardian email;
    /// [`AccountError::Conflict`] for a taken username or email.
    async fn register(&self, registration: Registration) -> Result<UserProfile, AccountError>;

    /// Verifies credentials and runs the age-transition check.
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError>;

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, AccountError>;

    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError>;

    async fn validate_reset_token(&self, token: &str) -> Result<bool, AccountError>;

    /// Removes the account and every row that references it.
    async fn delete_account(&self, user_id: &str) -> Result<(), AccountError>;
}
