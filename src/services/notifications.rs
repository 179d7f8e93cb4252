//! Guardian and account emails.
//!
//! Delivery is best-effort. Every send returns a [`Notified`] outcome that the
//! caller attaches to its own result instead of failing the operation.

use std::sync::Arc;

use html_escape::encode_text;
use serde::Serialize;
use tracing::warn;

use crate::clients::email::{EmailMessage, Mailer};
use crate::config::EmailConfig;

/// Outcome of a best-effort notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Notified {
    Sent,
    /// Nobody to notify (no guardian address, notifications turned off).
    Skipped,
    Failed(String),
}

impl Notified {
    /// Warning text for API responses, if delivery failed.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Failed(_) => Some("Notification email could not be sent".to_string()),
            Self::Sent | Self::Skipped => None,
        }
    }
}

/// The minor an email is about.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub name: &'a str,
    pub username: &'a str,
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    config: EmailConfig,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, config: EmailConfig) -> Self {
        Self { mailer, config }
    }

    async fn deliver(&self, message: EmailMessage) -> Notified {
        match self.mailer.send(&message).await {
            Ok(()) => Notified::Sent,
            Err(e) => {
                warn!(error = %e, subject = %message.subject, "Failed to send email");
                Notified::Failed(e.to_string())
            }
        }
    }

    fn link(&self, path: &str, token: &str) -> String {
        format!(
            "{}{}?token={}",
            self.config.public_base_url.trim_end_matches('/'),
            path,
            urlencoding::encode(token)
        )
    }

    pub async fn pin_setup(&self, guardian: Option<&str>, minor: Subject<'_>) -> Notified {
        let Some(to) = guardian else {
            return Notified::Skipped;
        };

        let body = format!(
            "<h2>PIN Setup Complete</h2>\
             <p>Hello,</p>\
             <p>A parental controls PIN has been set up for <strong>{name}</strong> (@{username}) on Mirro.</p>\
             <ul>\
             <li>Parental controls are now active</li>\
             <li>Messaging restrictions enabled</li>\
             <li>Event creation restrictions enabled</li>\
             <li>Content filtering enabled</li>\
             </ul>\
             <p>You can modify these settings anytime using the PIN in the Mirro app.</p>",
            name = encode_text(minor.name),
            username = encode_text(minor.username),
        );

        self.deliver(EmailMessage::from_html(
            to,
            format!("Mirro: Parental controls PIN set up for {}", minor.name),
            self.wrap(&body),
        ))
        .await
    }

    pub async fn pin_reset_requested(
        &self,
        guardian: &str,
        minor: Subject<'_>,
        token: &str,
        ttl_hours: i64,
    ) -> Notified {
        let link = self.link("/parental-controls/reset", token);
        let body = format!(
            "<h2>Reset Parental Controls PIN</h2>\
             <p>Hello,</p>\
             <p>We received a request to reset the parental controls PIN for <strong>{name}</strong> (@{username}).</p>\
             <p><a href=\"{link}\">Reset PIN</a></p>\
             <p>This link expires in {ttl_hours} hours and can only be used once.</p>\
             <p>If you did not request this, you can ignore this email. The current PIN stays active.</p>",
            name = encode_text(minor.name),
            username = encode_text(minor.username),
            link = html_escape::encode_double_quoted_attribute(&link),
        );

        self.deliver(EmailMessage::from_html(
            guardian,
            "Mirro: Reset your parental controls PIN",
            self.wrap(&body),
        ))
        .await
    }

    pub async fn pin_reset_completed(&self, guardian: Option<&str>, minor: Subject<'_>) -> Notified {
        let Some(to) = guardian else {
            return Notified::Skipped;
        };

        let body = format!(
            "<h2>PIN Reset Successful</h2>\
             <p>Hello,</p>\
             <p>The parental controls PIN for <strong>{name}</strong> (@{username}) has been changed.</p>",
            name = encode_text(minor.name),
            username = encode_text(minor.username),
        );

        self.deliver(EmailMessage::from_html(
            to,
            format!("Mirro: Parental controls PIN changed for {}", minor.name),
            self.wrap(&body),
        ))
        .await
    }

    pub async fn controls_disabled(&self, guardian: Option<&str>, minor: Subject<'_>) -> Notified {
        let Some(to) = guardian else {
            return Notified::Skipped;
        };

        let body = format!(
            "<h2>Parental Controls Disabled</h2>\
             <p>Hello,</p>\
             <p>Parental controls have been disabled for <strong>{name}</strong> (@{username}) on Mirro. \
             The account now has full access.</p>",
            name = encode_text(minor.name),
            username = encode_text(minor.username),
        );

        self.deliver(EmailMessage::from_html(
            to,
            format!("Mirro: Parental controls disabled for {}", minor.name),
            self.wrap(&body),
        ))
        .await
    }

    pub async fn password_reset(&self, to: &str, token: &str, ttl_minutes: i64) -> Notified {
        let link = self.link("/reset-password", token);
        let body = format!(
            "<h2>Reset Your Password</h2>\
             <p>Hello,</p>\
             <p>We received a request to reset your password for your Mirro account. \
             If you didn't make this request, you can safely ignore this email.</p>\
             <p><a href=\"{link}\">Reset Password</a></p>\
             <p>This link will expire in {ttl_minutes} minutes.</p>",
            link = html_escape::encode_double_quoted_attribute(&link),
        );

        self.deliver(EmailMessage::from_html(
            to,
            "Reset Your Password - Mirro",
            self.wrap(&body),
        ))
        .await
    }

    fn wrap(&self, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
             <body style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             {body}\
             <p style=\"color: #666; font-size: 12px;\">Questions? Contact {support}.</p>\
             </body></html>",
            support = encode_text(&self.config.support_address),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<EmailMessage>>);

    #[async_trait]
    impl Mailer for Capture {
        async fn send(&self, message: &EmailMessage) -> Result<()> {
            self.0.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Mailer for Broken {
        async fn send(&self, _message: &EmailMessage) -> Result<()> {
            bail!("smtp down")
        }
    }

    fn minor() -> Subject<'static> {
        Subject {
            name: "Sam <script>",
            username: "sam",
        }
    }

    #[tokio::test]
    async fn test_reset_link_contains_token() {
        let capture = Arc::new(Capture::default());
        let notifier = Notifier::new(capture.clone(), EmailConfig::default());

        let outcome = notifier
            .pin_reset_requested("guardian@example.com", minor(), "abc123", 24)
            .await;
        assert_eq!(outcome, Notified::Sent);

        let sent = capture.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "guardian@example.com");
        assert!(sent[0]
            .html
            .contains("http://localhost:3000/parental-controls/reset?token=abc123"));
        assert!(!sent[0].html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_missing_guardian_is_skipped() {
        let capture = Arc::new(Capture::default());
        let notifier = Notifier::new(capture.clone(), EmailConfig::default());

        assert_eq!(notifier.pin_setup(None, minor()).await, Notified::Skipped);
        assert!(capture.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let notifier = Notifier::new(Arc::new(Broken), EmailConfig::default());
        let outcome = notifier
            .controls_disabled(Some("guardian@example.com"), minor())
            .await;

        assert!(matches!(outcome, Notified::Failed(ref reason) if reason.contains("smtp down")));
        assert!(outcome.warning().is_some());
    }
}
