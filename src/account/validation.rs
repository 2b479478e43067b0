//! Input validation for currencies and usernames
//!
//! `Currency` is a closed set; anything outside it is rejected at the API
//! boundary and can never reach the ledger store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported currency: '{0}'")]
    UnsupportedCurrency(String),

    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

// ============================================================================
// Currency
// ============================================================================

/// Supported account currency.
///
/// Serialized as the upper-case ISO code, which is also what the
/// `accounts.currency` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Idr,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::Usd, Currency::Eur, Currency::Idr, Currency::Cad];

    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Idr => "IDR",
            Currency::Cad => "CAD",
        }
    }

    pub fn is_supported(code: &str) -> bool {
        code.parse::<Currency>().is_ok()
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "IDR" => Ok(Currency::Idr),
            "CAD" => Ok(Currency::Cad),
            other => Err(ValidationError::UnsupportedCurrency(other.to_string())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Username
// ============================================================================

/// Check a username: 3-32 chars of ASCII letters, digits or `_`.
pub fn validate_username(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ValidationError::InvalidLength {
            field: "username",
            min: 3,
            max: 32,
            actual: len,
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username",
            value: name.to_string(),
            expected: "letters, digits, underscore only",
        });
    }

    Ok(())
}

// ============================================================================
// Request validation (validator crate glue)
// ============================================================================

fn field_error(code: &'static str, e: ValidationError) -> validator::ValidationError {
    let mut err = validator::ValidationError::new(code);
    err.message = Some(e.to_string().into());
    err
}

/// `#[validate(custom(function = "username_rule"))]`
pub fn username_rule(username: &str) -> Result<(), validator::ValidationError> {
    validate_username(username).map_err(|e| field_error("username", e))
}

/// `#[validate(custom(function = "currency_rule"))]`
pub fn currency_rule(code: &str) -> Result<(), validator::ValidationError> {
    code.parse::<Currency>()
        .map(|_| ())
        .map_err(|e| field_error("currency", e))
}

/// Flatten `validator` errors into one line, sorted for stable output
pub fn describe_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
