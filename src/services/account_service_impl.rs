//! `SeaORM` implementation of the `AccountService` trait.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use regex::Regex;
use tracing::{info, warn};

use crate::config::{AccountConfig, ParentalConfig};
use crate::db::{NewUser, Store, User};
use crate::domain::AgeCategory;
use crate::domain::age::{self, AgeBracket};
use crate::services::account_service::{
    AccountError, AccountService, LoginOutcome, Registration, UserProfile,
};
use crate::services::credentials::{SecretHasher, generate_token};
use crate::services::notifications::{Notified, Notifier};
use crate::services::parental_service::ParentalService;

const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]{3,30}$").expect("Invalid regex"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"))
}

#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_username(username: &str) -> Result<(), AccountError> {
    if username.chars().count() < 3 {
        return Err(AccountError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }
    if !username_regex().is_match(username) {
        return Err(AccountError::Validation(
            "Username may only contain letters, numbers, underscores and dots (max 30)"
                .to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AccountError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(AccountError::Validation("Invalid email address".to_string()))
    }
}

pub struct SeaOrmAccountService {
    store: Store,
    hasher: SecretHasher,
    accounts: AccountConfig,
    ages: ParentalConfig,
    parental: Arc<dyn ParentalService>,
    notifier: Arc<Notifier>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(
        store: Store,
        hasher: SecretHasher,
        accounts: AccountConfig,
        ages: ParentalConfig,
        parental: Arc<dyn ParentalService>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            store,
            hasher,
            accounts,
            ages,
            parental,
            notifier,
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AccountError> {
        if password.chars().count() < self.accounts.min_password_length {
            return Err(AccountError::Validation(format!(
                "Password must be at least {} characters long",
                self.accounts.min_password_length
            )));
        }
        Ok(())
    }

    /// Returns `(date_of_birth, category, guardian_email)` to store.
    fn classify_registration(
        &self,
        registration: &Registration,
    ) -> Result<(Option<String>, AgeCategory, Option<String>), AccountError> {
        let Some(raw_dob) = registration
            .date_of_birth
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        else {
            return Ok((None, AgeCategory::Adult, None));
        };

        let today = Utc::now().date_naive();
        let dob = age::parse_date_of_birth(raw_dob, today).map_err(AccountError::Validation)?;

        match age::classify(dob, today, self.ages.minimum_age, self.ages.age_of_majority) {
            AgeBracket::BelowMinimum => Err(AccountError::Validation(format!(
                "You must be at least {} years old to register",
                self.ages.minimum_age
            ))),
            AgeBracket::Minor => {
                let guardian = registration
                    .guardian_email
                    .as_deref()
                    .map(normalize_email)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        AccountError::Validation(
                            "Guardian email is required for users under 18".to_string(),
                        )
                    })?;
                validate_email(&guardian)?;
                Ok((
                    Some(dob.format("%Y-%m-%d").to_string()),
                    AgeCategory::Minor,
                    Some(guardian),
                ))
            }
            AgeBracket::Adult => Ok((
                Some(dob.format("%Y-%m-%d").to_string()),
                AgeCategory::Adult,
                None,
            )),
        }
    }

    async fn profile_of(&self, user: User) -> Result<UserProfile, AccountError> {
        let (followers, following) = self.store.users().follow_counts(&user.id).await?;
        Ok(UserProfile::new(user, followers, following))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, registration: Registration) -> Result<UserProfile, AccountError> {
        let name = registration.name.trim().to_string();
        let username = registration.username.trim().to_string();
        let email = normalize_email(&registration.email);

        if name.is_empty() || username.is_empty() || email.is_empty() {
            return Err(AccountError::Validation(
                "Name, username, email and password are required".to_string(),
            ));
        }
        validate_username(&username)?;
        validate_email(&email)?;
        self.validate_password(&registration.password)?;

        let (date_of_birth, age_category, guardian_email) =
            self.classify_registration(&registration)?;

        let users = self.store.users();
        if users.username_taken(&username).await? {
            return Err(AccountError::Conflict("Username already exists".to_string()));
        }
        if users.email_taken(&email).await? {
            return Err(AccountError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hasher.hash(&registration.password).await?;

        let user = users
            .create(NewUser {
                name,
                username,
                email,
                password_hash,
                date_of_birth,
                age_category,
                guardian_email,
            })
            .await?;

        info!(user_id = %user.id, category = %user.age_category, "User registered");
        Ok(UserProfile::new(user, 0, 0))
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let email = normalize_email(email);

        let Some((user, password_hash)) = self
            .store
            .users()
            .get_by_email_with_password(&email)
            .await?
        else {
            return Err(AccountError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &password_hash).await? {
            return Err(AccountError::InvalidCredentials);
        }

        let transition = self
            .parental
            .check_age_transition(&user.id)
            .await
            .map_err(|e| AccountError::Internal(e.to_string()))?;

        let user = if transition.transitioned {
            self.store
                .users()
                .get_by_id(&user.id)
                .await?
                .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?
        } else {
            user
        };

        Ok(LoginOutcome {
            user: self.profile_of(user).await?,
            age_transitioned: transition.transitioned,
        })
    }

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, AccountError> {
        let user = self
            .store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))?;

        self.profile_of(user).await
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AccountError::Validation("Email is required".to_string()));
        }

        let Some(user) = self.store.users().get_by_email(&email).await? else {
            return Ok(());
        };

        let token = generate_token();
        let expires_at = Utc::now() + Duration::minutes(self.accounts.password_reset_ttl_minutes);
        self.store
            .password_resets()
            .issue(&user.id, &token, expires_at)
            .await?;

        if let Notified::Failed(reason) = self
            .notifier
            .password_reset(&user.email, &token, self.accounts.password_reset_ttl_minutes)
            .await
        {
            warn!(user_id = %user.id, %reason, "Password reset email was not delivered");
        }

        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AccountError> {
        let now = Utc::now();
        let record = self
            .store
            .password_resets()
            .find(token)
            .await?
            .filter(|t| t.is_redeemable(now))
            .ok_or_else(|| AccountError::InvalidToken(INVALID_RESET_TOKEN.to_string()))?;

        self.validate_password(new_password)?;

        let password_hash = self.hasher.hash(new_password).await?;
        if !self
            .store
            .password_resets()
            .redeem(token, &record.user_id, &password_hash, now)
            .await?
        {
            return Err(AccountError::InvalidToken(INVALID_RESET_TOKEN.to_string()));
        }

        info!(user_id = %record.user_id, "Password reset completed");
        Ok(())
    }

    async fn validate_reset_token(&self, token: &str) -> Result<bool, AccountError> {
        let now = Utc::now();
        Ok(self
            .store
            .password_resets()
            .find(token)
            .await?
            .is_some_and(|t| t.is_redeemable(now)))
    }

    async fn delete_account(&self, user_id: &str) -> Result<(), AccountError> {
        if !self.store.users().delete_cascade(user_id).await? {
            return Err(AccountError::NotFound("User not found".to_string()));
        }

        info!(user_id, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("sam_k.22").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("emoji🙂").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("sam@example.com").is_ok());
        assert!(validate_email("sam@localhost").is_err());
        assert!(validate_email("not an email").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Sam@Example.COM "), "sam@example.com");
    }
}
