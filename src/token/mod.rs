//! Access tokens
//!
//! [`TokenMaker`] issues and verifies signed, time-bound identity tokens.
//! The auth middleware only depends on the trait.

pub mod jwt;

pub use jwt::JwtMaker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid key size: must be at least {min} bytes, got {actual}")]
    InvalidKeySize { min: usize, actual: usize },

    #[error("token has expired")]
    ExpiredToken,

    #[error("token is invalid")]
    InvalidToken,

    #[error("token duration out of range")]
    InvalidDuration,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Identity carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }
}

pub trait TokenMaker: Send + Sync {
    /// Sign a new token for `username` valid for `duration`
    fn create_token(&self, username: &str, duration: Duration)
    -> Result<(String, Payload), TokenError>;

    /// Check signature and expiry, returning the embedded payload
    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}
