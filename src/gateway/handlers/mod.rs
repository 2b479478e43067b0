//! HTTP handlers
//!
//! Every handler answers with the `ApiResponse` envelope, errors included.

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, get_account, list_accounts};
pub use health::{HealthResponse, health_check};
pub use transfer::{create_transfer, get_transfer};

use super::types::{ApiError, error_codes};

/// Parse a positive id path segment
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::bad_request(
            error_codes::INVALID_PARAMETER,
            format!("Invalid {what} id: {raw}"),
        )),
    }
}

/// Map an extractor rejection (bad JSON, bad query string) to a 400 envelope
pub(crate) fn bad_input(rejection: impl std::fmt::Display) -> ApiError {
    ApiError::bad_request(error_codes::INVALID_PARAMETER, rejection.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "account").unwrap(), 42);
        assert!(parse_id("0", "account").is_err());
        assert!(parse_id("-3", "account").is_err());
        let err = parse_id("abc", "transfer").unwrap_err();
        assert_eq!(err.msg, "Invalid transfer id: abc");
    }
}
