//! `SeaORM` implementation of the `ParentalService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::config::ParentalConfig;
use crate::db::{ParentalSettings, SettingsUpdate, Store, User};
use crate::domain::age::{self, AgeBracket};
use crate::domain::pin::{Claim, GateCheck, PinPolicy};
use crate::domain::{AgeCategory, PolicyDecision};
use crate::services::credentials::{SecretHasher, generate_token};
use crate::services::notifications::{Notified, Notifier, Subject};
use crate::services::parental_service::{
    AgeTransition, ParentalError, ParentalService, ResetOutcome, SetupOutcome,
};

const NOT_CONFIGURED: &str = "Parental controls not configured";

pub struct SeaOrmParentalService {
    store: Store,
    hasher: SecretHasher,
    policy: PinPolicy,
    config: ParentalConfig,
    notifier: Arc<Notifier>,
}

impl SeaOrmParentalService {
    #[must_use]
    pub fn new(
        store: Store,
        hasher: SecretHasher,
        config: ParentalConfig,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            store,
            hasher,
            policy: PinPolicy::from(&config),
            config,
            notifier,
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<User, ParentalError> {
        self.store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ParentalError::NotFound("User not found".to_string()))
    }

    /// The attempt-limited gate shared by verify, settings and disable.
    async fn gate(&self, user_id: &str, pin: &str) -> Result<(), ParentalError> {
        let repo = self.store.parental();
        let now = Utc::now();

        if let GateCheck::Locked {
            until,
            retry_after_seconds,
        } = self.policy.check(&repo.get_attempts(user_id).await?, now)
        {
            return Err(locked_out(until, retry_after_seconds));
        }

        let Some((pin_hash, _)) = repo.get_controls(user_id).await? else {
            return Err(ParentalError::NotFound(NOT_CONFIGURED.to_string()));
        };

        // Charged before comparing. A concurrent burst may have locked the
        // gate since the check above.
        let charged = match repo.claim_attempt(user_id, &self.policy, now).await? {
            Claim::Granted(charged) => charged,
            Claim::Locked {
                until,
                retry_after_seconds,
            } => return Err(locked_out(until, retry_after_seconds)),
        };

        if self.hasher.verify(pin, &pin_hash).await? {
            repo.reset_attempts(user_id).await?;
            record_outcome("success");
            return Ok(());
        }

        if let Some(until) = charged.locked_until {
            warn!(user_id, locked_until = %until, "PIN gate locked after repeated failures");
            record_outcome("lockout_started");
        } else {
            record_outcome("failure");
        }

        Err(ParentalError::InvalidPin {
            attempts_remaining: charged.attempts_remaining,
        })
    }

    async fn settings_of(&self, user_id: &str) -> Result<Option<ParentalSettings>, ParentalError> {
        Ok(self.store.parental().get_settings(user_id).await?)
    }
}

fn locked_out(until: DateTime<Utc>, retry_after_seconds: i64) -> ParentalError {
    record_outcome("locked");
    ParentalError::LockedOut {
        locked_until: until,
        retry_after_seconds,
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("pin_verifications_total", "outcome" => outcome).increment(1);
}

fn subject_of(user: &User) -> Subject<'_> {
    Subject {
        name: &user.name,
        username: &user.username,
    }
}

#[async_trait]
impl ParentalService for SeaOrmParentalService {
    async fn setup_pin(
        &self,
        user_id: &str,
        pin: &str,
        confirm_pin: &str,
    ) -> Result<SetupOutcome, ParentalError> {
        self.policy
            .validate_new_pin(pin, confirm_pin)
            .map_err(ParentalError::Validation)?;

        let user = self.load_user(user_id).await?;
        if user.age_category != AgeCategory::Minor {
            return Err(ParentalError::Validation(
                "Parental controls are only available for minor accounts".to_string(),
            ));
        }

        let repo = self.store.parental();
        if repo.get_controls(user_id).await?.is_some() {
            return Err(ParentalError::Validation(
                "PIN already configured. Use reset PIN to change it.".to_string(),
            ));
        }

        let pin_hash = self.hasher.hash(pin).await?;
        let settings = repo.create_controls(user_id, &pin_hash).await?;
        info!(user_id, "Parental controls PIN configured");

        let notification = self
            .notifier
            .pin_setup(user.guardian_email.as_deref(), subject_of(&user))
            .await;

        Ok(SetupOutcome {
            settings,
            notification,
        })
    }

    async fn verify_pin(&self, user_id: &str, pin: &str) -> Result<(), ParentalError> {
        self.gate(user_id, pin).await
    }

    async fn get_settings(
        &self,
        user_id: &str,
        pin: &str,
    ) -> Result<ParentalSettings, ParentalError> {
        self.gate(user_id, pin).await?;

        self.settings_of(user_id)
            .await?
            .ok_or_else(|| ParentalError::NotFound(NOT_CONFIGURED.to_string()))
    }

    async fn update_settings(
        &self,
        user_id: &str,
        pin: &str,
        update: SettingsUpdate,
    ) -> Result<ParentalSettings, ParentalError> {
        self.gate(user_id, pin).await?;

        let settings = self
            .store
            .parental()
            .update_settings(user_id, update)
            .await?
            .ok_or_else(|| ParentalError::NotFound(NOT_CONFIGURED.to_string()))?;

        info!(user_id, ?settings, "Parental settings updated");
        Ok(settings)
    }

    async fn request_pin_reset(&self, guardian_email: &str) -> Result<(), ParentalError> {
        let guardian_email = guardian_email.trim().to_lowercase();
        if guardian_email.is_empty() {
            return Err(ParentalError::Validation("Email is required".to_string()));
        }

        let Some(user) = self
            .store
            .users()
            .get_by_guardian_email(&guardian_email)
            .await?
        else {
            return Ok(());
        };

        let repo = self.store.parental();
        if repo.get_controls(&user.id).await?.is_none() {
            return Ok(());
        }

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.config.reset_token_ttl_hours);
        repo.create_reset_token(&user.id, &token, expires_at).await?;

        let outcome = self
            .notifier
            .pin_reset_requested(
                &guardian_email,
                subject_of(&user),
                &token,
                self.config.reset_token_ttl_hours,
            )
            .await;

        if let Notified::Failed(reason) = outcome {
            warn!(user_id = %user.id, %reason, "PIN reset email was not delivered");
        }

        Ok(())
    }

    async fn complete_pin_reset(
        &self,
        token: &str,
        new_pin: &str,
        confirm_pin: &str,
    ) -> Result<ResetOutcome, ParentalError> {
        let repo = self.store.parental();
        let now = Utc::now();

        let record = repo
            .find_reset_token(token)
            .await?
            .ok_or_else(|| ParentalError::InvalidToken("Invalid reset token".to_string()))?;

        if record.used {
            return Err(ParentalError::InvalidToken(
                "Reset token already used".to_string(),
            ));
        }
        if !record.is_redeemable(now) {
            return Err(ParentalError::InvalidToken("Reset token expired".to_string()));
        }

        self.policy
            .validate_new_pin(new_pin, confirm_pin)
            .map_err(ParentalError::Validation)?;

        let pin_hash = self.hasher.hash(new_pin).await?;
        if !repo
            .complete_reset(token, &record.user_id, &pin_hash, now)
            .await?
        {
            return Err(ParentalError::InvalidToken(
                "Reset token already used".to_string(),
            ));
        }

        info!(user_id = %record.user_id, "Parental controls PIN reset");

        let notification = match self.store.users().get_by_id(&record.user_id).await? {
            Some(user) => {
                self.notifier
                    .pin_reset_completed(user.guardian_email.as_deref(), subject_of(&user))
                    .await
            }
            None => Notified::Skipped,
        };

        Ok(ResetOutcome {
            user_id: record.user_id,
            notification,
        })
    }

    async fn disable(&self, user_id: &str, pin: &str) -> Result<Notified, ParentalError> {
        self.gate(user_id, pin).await?;

        let user = self.load_user(user_id).await?;
        self.store
            .parental()
            .remove_controls_and_promote(user_id)
            .await?;
        info!(user_id, "Parental controls disabled");

        Ok(self
            .notifier
            .controls_disabled(user.guardian_email.as_deref(), subject_of(&user))
            .await)
    }

    async fn check_age_transition(&self, user_id: &str) -> Result<AgeTransition, ParentalError> {
        let user = self.load_user(user_id).await?;

        let unchanged = AgeTransition {
            transitioned: false,
            age_category: user.age_category,
        };

        if user.age_category != AgeCategory::Minor {
            return Ok(unchanged);
        }
        let Some(raw_dob) = user.date_of_birth.as_deref() else {
            return Ok(unchanged);
        };

        let today = Utc::now().date_naive();
        let dob = match age::parse_date_of_birth(raw_dob, today) {
            Ok(dob) => dob,
            Err(reason) => {
                warn!(user_id, %reason, "Stored date of birth is unusable");
                return Ok(unchanged);
            }
        };

        let bracket = age::classify(
            dob,
            today,
            self.config.minimum_age,
            self.config.age_of_majority,
        );
        if bracket != AgeBracket::Adult {
            return Ok(unchanged);
        }

        let transitioned = self.store.parental().transition_to_adult(user_id).await?;
        if transitioned {
            info!(user_id, "Minor reached age of majority, parental controls removed");
        }

        Ok(AgeTransition {
            transitioned,
            age_category: AgeCategory::Adult,
        })
    }

    async fn can_send_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<PolicyDecision, ParentalError> {
        let social = self.store.social();

        if social.has_blocked(recipient_id, sender_id).await? {
            return Ok(PolicyDecision::deny("You are blocked by this user"));
        }

        if let Some(settings) = self.settings_of(sender_id).await?
            && settings.messaging_restricted
            && !social.is_following(sender_id, recipient_id).await?
        {
            return Ok(PolicyDecision::deny(
                "Messaging is restricted by parental controls. You can only message users you follow.",
            ));
        }

        Ok(PolicyDecision::allow())
    }

    async fn can_create_public_event(
        &self,
        user_id: &str,
    ) -> Result<PolicyDecision, ParentalError> {
        if let Some(settings) = self.settings_of(user_id).await?
            && settings.event_creation_restricted
        {
            return Ok(PolicyDecision::deny(
                "Public event creation is restricted by parental controls. You can create private events only.",
            ));
        }

        Ok(PolicyDecision::allow())
    }

    async fn should_filter_content(
        &self,
        user_id: &str,
        event_is_mature: bool,
    ) -> Result<bool, ParentalError> {
        if !event_is_mature {
            return Ok(false);
        }

        Ok(self
            .settings_of(user_id)
            .await?
            .is_some_and(|s| s.content_filtering_enabled))
    }
}
