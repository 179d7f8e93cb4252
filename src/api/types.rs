use serde::{Deserialize, Serialize};

use crate::services::Notified;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Message plus an optional warning when the guardian could not be emailed.
#[derive(Debug, Serialize)]
pub struct NotifiedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl NotifiedResponse {
    pub fn new(message: impl Into<String>, notification: &Notified) -> Self {
        if let Notified::Failed(reason) = notification {
            tracing::warn!(reason = %reason, "Guardian notification failed");
        }
        Self {
            message: message.into(),
            warning: notification.warning(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPinRequest {
    pub user_id: String,
    pub pin: String,
}

/// Pair of users for follow and block requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPairRequest {
    pub user_id: String,
    pub target_user_id: String,
}
