use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::ApiResponse;
use crate::services::{AccountError, EventError, ParentalError, SocialError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    InvalidToken(String),

    InvalidPin { attempts_remaining: u32 },

    LockedOut {
        message: String,
        locked_until: DateTime<Utc>,
        retry_after_seconds: i64,
    },

    Forbidden(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            ApiError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            ApiError::InvalidPin { attempts_remaining } => {
                write!(f, "Incorrect PIN ({attempts_remaining} attempts remaining)")
            }
            ApiError::LockedOut { message, .. } => write!(f, "Locked out: {message}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Failure body for the PIN gate. Carries the cooldown alongside the message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinFailureBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidPin { attempts_remaining } => {
                let body = PinFailureBody {
                    success: false,
                    error: "Incorrect PIN".to_string(),
                    attempts_remaining: Some(attempts_remaining),
                    locked_until: None,
                    retry_after_seconds: None,
                };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ApiError::LockedOut {
                message,
                locked_until,
                retry_after_seconds,
            } => {
                let body = PinFailureBody {
                    success: false,
                    error: message,
                    attempts_remaining: Some(0),
                    locked_until: Some(locked_until.to_rfc3339()),
                    retry_after_seconds: Some(retry_after_seconds),
                };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) | ApiError::InvalidToken(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<ParentalError> for ApiError {
    fn from(err: ParentalError) -> Self {
        match err {
            ParentalError::Validation(msg) => Self::ValidationError(msg),
            ParentalError::InvalidPin { attempts_remaining } => {
                Self::InvalidPin { attempts_remaining }
            }
            ParentalError::LockedOut {
                locked_until,
                retry_after_seconds,
            } => Self::LockedOut {
                message: err.to_string(),
                locked_until,
                retry_after_seconds,
            },
            ParentalError::InvalidToken(msg) => Self::InvalidToken(msg),
            ParentalError::NotFound(msg) => Self::NotFound(msg),
            ParentalError::Database(msg) => Self::DatabaseError(msg),
            ParentalError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => Self::ValidationError(msg),
            AccountError::InvalidCredentials => {
                Self::Unauthorized("Invalid email or password".to_string())
            }
            AccountError::NotFound(msg) => Self::NotFound(msg),
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::InvalidToken(msg) => Self::InvalidToken(msg),
            AccountError::Database(msg) => Self::DatabaseError(msg),
            AccountError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::Validation(msg) => Self::ValidationError(msg),
            SocialError::Forbidden(msg) => Self::Forbidden(msg),
            SocialError::NotFound(msg) => Self::NotFound(msg),
            SocialError::Conflict(msg) => Self::Conflict(msg),
            SocialError::Database(msg) => Self::DatabaseError(msg),
            SocialError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Validation(msg) => Self::ValidationError(msg),
            EventError::Forbidden(msg) => Self::Forbidden(msg),
            EventError::NotFound(msg) => Self::NotFound(msg),
            EventError::Conflict(msg) => Self::Conflict(msg),
            EventError::Database(msg) => Self::DatabaseError(msg),
            EventError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_pin_carries_remaining_attempts() {
        let (status, body) = body_json(ParentalError::InvalidPin {
            attempts_remaining: 3,
        }
        .into())
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["attemptsRemaining"], 3);
        assert!(body.get("lockedUntil").is_none());
    }

    #[tokio::test]
    async fn test_lockout_carries_cooldown() {
        let until = Utc::now() + chrono::Duration::seconds(600);
        let (status, body) = body_json(
            ParentalError::LockedOut {
                locked_until: until,
                retry_after_seconds: 600,
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["retryAfterSeconds"], 600);
        assert_eq!(body["lockedUntil"], until.to_rfc3339());
        assert!(body["error"].as_str().unwrap().contains("600"));
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let (status, body) = body_json(ApiError::internal("disk on fire")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_service_errors_map_to_status() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                AccountError::Conflict("taken".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                SocialError::Forbidden("no".into()).into(),
                StatusCode::FORBIDDEN,
            ),
            (
                EventError::NotFound("gone".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                ParentalError::InvalidToken("bad".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (AccountError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
