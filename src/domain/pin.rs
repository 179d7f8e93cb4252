//! Attempt-limited PIN gate.
//!
//! The gate is evaluated against the persisted attempt row for a user. All
//! functions here are pure: the caller supplies `now` and writes the returned
//! state back to storage.
//!
//! An attempt is charged before the PIN is compared, so concurrent guesses
//! draw from one budget and at most `max_attempts` comparisons happen per
//! lockout window. A successful comparison clears the charge.

use chrono::{DateTime, Duration, Utc};

use crate::config::ParentalConfig;

/// Tunables for PIN format and lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinPolicy {
    pub pin_length: usize,
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl From<&ParentalConfig> for PinPolicy {
    fn from(config: &ParentalConfig) -> Self {
        Self {
            pin_length: config.pin_length,
            max_attempts: config.max_attempts,
            lockout: Duration::seconds(i64::try_from(config.lockout_seconds).unwrap_or(i64::MAX)),
        }
    }
}

/// Persisted failure state for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    pub count: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Result of checking the gate before comparing a PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    /// Verification may proceed. `count` is the failure count to build on.
    Open { count: u32 },
    Locked {
        until: DateTime<Utc>,
        retry_after_seconds: i64,
    },
}

/// State persisted when an attempt is charged. It stands as the failure
/// record if the comparison fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub attempts_remaining: u32,
}

/// Result of charging an attempt against the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Granted(FailedAttempt),
    Locked {
        until: DateTime<Utc>,
        retry_after_seconds: i64,
    },
}

impl PinPolicy {
    pub fn validate_format(&self, pin: &str) -> Result<(), String> {
        if pin.len() != self.pin_length || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("PIN must be exactly {} digits", self.pin_length));
        }
        Ok(())
    }

    /// Validates a new PIN and its confirmation.
    pub fn validate_new_pin(&self, pin: &str, confirm_pin: &str) -> Result<(), String> {
        self.validate_format(pin)?;
        if pin != confirm_pin {
            return Err("PINs do not match".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn check(&self, state: &AttemptState, now: DateTime<Utc>) -> GateCheck {
        match state.locked_until {
            Some(until) if until > now => GateCheck::Locked {
                until,
                retry_after_seconds: (until - now).num_seconds().max(1),
            },
            // An elapsed lockout grants a fresh budget.
            Some(_) => GateCheck::Open { count: 0 },
            None => GateCheck::Open { count: state.count },
        }
    }

    /// Charges one attempt, or refuses if the gate is locked.
    #[must_use]
    pub fn claim(&self, state: &AttemptState, now: DateTime<Utc>) -> Claim {
        match self.check(state, now) {
            GateCheck::Locked {
                until,
                retry_after_seconds,
            } => Claim::Locked {
                until,
                retry_after_seconds,
            },
            GateCheck::Open { count } => Claim::Granted(self.record_failure(count, now)),
        }
    }

    #[must_use]
    pub fn record_failure(&self, count: u32, now: DateTime<Utc>) -> FailedAttempt {
        let count = count.saturating_add(1);
        let locked_until = (count >= self.max_attempts).then(|| now + self.lockout);

        FailedAttempt {
            count,
            locked_until,
            attempts_remaining: self.max_attempts.saturating_sub(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PinPolicy {
        PinPolicy {
            pin_length: 4,
            max_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }

    #[test]
    fn test_validate_format() {
        let policy = policy();
        assert!(policy.validate_format("1234").is_ok());
        assert!(policy.validate_format("0000").is_ok());
        assert!(policy.validate_format("123").is_err());
        assert!(policy.validate_format("12345").is_err());
        assert!(policy.validate_format("12a4").is_err());
        assert!(policy.validate_format("").is_err());
        assert!(policy.validate_format("١٢٣٤").is_err());
    }

    #[test]
    fn test_validate_new_pin_mismatch() {
        let policy = policy();
        assert!(policy.validate_new_pin("1234", "1234").is_ok());
        assert_eq!(
            policy.validate_new_pin("1234", "4321").unwrap_err(),
            "PINs do not match"
        );
        assert!(policy.validate_new_pin("12", "12").is_err());
    }

    #[test]
    fn test_locks_after_max_attempts() {
        let policy = policy();
        let now = Utc::now();
        let mut count = 0;

        for expected_remaining in (0..5).rev() {
            let GateCheck::Open { count: current } =
                policy.check(&AttemptState { count, locked_until: None }, now)
            else {
                panic!("gate should be open");
            };
            let failed = policy.record_failure(current, now);
            assert_eq!(failed.attempts_remaining, expected_remaining);
            count = failed.count;
            if expected_remaining > 0 {
                assert!(failed.locked_until.is_none());
            } else {
                assert_eq!(failed.locked_until, Some(now + Duration::minutes(15)));
            }
        }

        let state = AttemptState {
            count,
            locked_until: Some(now + Duration::minutes(15)),
        };
        assert!(matches!(
            policy.check(&state, now + Duration::minutes(1)),
            GateCheck::Locked { retry_after_seconds: 840, .. }
        ));
    }

    #[test]
    fn test_elapsed_lockout_reopens_with_fresh_budget() {
        let policy = policy();
        let now = Utc::now();
        let state = AttemptState {
            count: 5,
            locked_until: Some(now - Duration::seconds(1)),
        };

        assert_eq!(policy.check(&state, now), GateCheck::Open { count: 0 });
    }

    #[test]
    fn test_claims_stop_once_budget_is_spent() {
        let policy = policy();
        let now = Utc::now();
        let mut state = AttemptState::default();

        for _ in 0..5 {
            let Claim::Granted(charged) = policy.claim(&state, now) else {
                panic!("claim should be granted");
            };
            state = AttemptState {
                count: charged.count,
                locked_until: charged.locked_until,
            };
        }

        assert_eq!(state.count, 5);
        assert!(matches!(
            policy.claim(&state, now),
            Claim::Locked { retry_after_seconds: 900, .. }
        ));
    }

    #[test]
    fn test_retry_after_never_zero_while_locked() {
        let policy = policy();
        let now = Utc::now();
        let state = AttemptState {
            count: 5,
            locked_until: Some(now + Duration::milliseconds(200)),
        };

        assert!(matches!(
            policy.check(&state, now),
            GateCheck::Locked { retry_after_seconds: 1, .. }
        ));
    }
}
