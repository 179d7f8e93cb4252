use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EmailConfig;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    /// Builds a message, deriving the plain-text part from the HTML body.
    pub fn from_html(to: impl Into<String>, subject: impl Into<String>, html: String) -> Self {
        let text = html2text::from_read(html.as_bytes(), 80)
            .unwrap_or_else(|_| html.clone());
        Self {
            to: to.into(),
            subject: subject.into(),
            html,
            text,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Delivers mail through the Resend HTTP API.
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendClient {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if config.resend_api_key.trim().is_empty() {
            bail!("Email is enabled but no Resend API key is configured");
        }

        let client = Client::builder()
            .user_agent("Mirro/1.0")
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.resend_api_key.trim().to_string(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let url = format!("{}/emails", self.base_url);
        let body = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to connect to Resend")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Resend rejected message: status={status}, body={body}");
        }

        let sent: SendResponse = response
            .json()
            .await
            .context("Failed to parse Resend response")?;
        debug!(id = ?sent.id, to = %message.to, "Email sent");

        Ok(())
    }
}

/// Used when email is disabled: logs the message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled, message not sent"
        );
        debug!(body = %message.text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_derived_from_html() {
        let message = EmailMessage::from_html(
            "guardian@example.com",
            "Hello",
            "<p>Reset link: <a href=\"https://x/y?token=abc\">here</a></p>".to_string(),
        );
        assert!(message.text.contains("Reset link"));
        assert!(!message.text.contains("<p>"));
    }

    #[test]
    fn test_resend_requires_key() {
        let config = EmailConfig {
            enabled: true,
            resend_api_key: String::new(),
            ..EmailConfig::default()
        };
        assert!(ResendClient::new(&config).is_err());

        let config = EmailConfig {
            enabled: true,
            resend_api_key: "re_test".to_string(),
            ..EmailConfig::default()
        };
        assert!(ResendClient::new(&config).is_ok());
    }
}
