/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: The caller's profile
/// - `groups`: Groups, participants and invitation codes
/// - `expenses`: Expenses, payments and balances
/// - `notifications`: Notification inbox and event stream

pub mod auth;
pub mod expenses;
pub mod groups;
pub mod health;
pub mod notifications;
pub mod users;

use crate::error::{ApiError, ApiResult};

/// Parses a numeric path segment; anything else is a 400.
pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {} id", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "group").unwrap(), 42);
        assert!(matches!(parse_id("abc", "group"), Err(ApiError::BadRequest(_))));
        assert!(parse_id("0", "group").is_err());
        assert!(parse_id("-3", "group").is_err());
        assert!(parse_id("4.5", "group").is_err());
    }
}
