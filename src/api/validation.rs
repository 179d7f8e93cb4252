use super::ApiError;

/// Rejects blank identifiers before they reach a service.
pub fn require_id<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if trimmed.len() > 64 {
        return Err(ApiError::validation(format!("{field} is too long")));
    }
    Ok(trimmed)
}

pub fn require_field<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value)
}

/// The caller must be acting on their own account.
pub fn require_self(session_user: &str, user_id: &str) -> Result<(), ApiError> {
    if session_user != user_id {
        return Err(ApiError::forbidden(
            "You can only perform this action for your own account",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(" abc ", "userId").unwrap(), "abc");
        assert!(require_id("", "userId").is_err());
        assert!(require_id("   ", "userId").is_err());
        assert!(require_id(&"x".repeat(65), "userId").is_err());
    }

    #[test]
    fn test_require_field_keeps_value() {
        assert_eq!(require_field(" 1234", "pin").unwrap(), " 1234");
        assert!(require_field("", "pin").is_err());
    }

    #[test]
    fn test_require_self() {
        assert!(require_self("a", "a").is_ok());
        assert!(matches!(
            require_self("a", "b"),
            Err(ApiError::Forbidden(_))
        ));
    }
}
