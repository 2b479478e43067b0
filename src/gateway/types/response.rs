//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: HTTP status + error code, renders as `ApiResponse<()>`
//! - `error_codes`: Standard error code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::StoreError;
use crate::transfer::TransferError;
use crate::user_auth::UserAuthError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// Handler error: status line plus `ApiResponse` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, msg)
    }

    pub fn unauthorized(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, msg)
    }

    pub fn forbidden(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, msg)
    }

    pub fn not_found(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, msg)
    }

    /// Log the cause, return a generic 500
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::not_found(error_codes::NOT_FOUND, "Record not found"),
            other => ApiError::internal(other),
        }
    }
}

impl From<UserAuthError> for ApiError {
    fn from(e: UserAuthError) -> Self {
        match e {
            UserAuthError::Validation(msg) => {
                ApiError::bad_request(error_codes::INVALID_PARAMETER, msg)
            }
            UserAuthError::UserExists => {
                ApiError::forbidden(error_codes::USER_EXISTS, "Username or email already exists")
            }
            UserAuthError::UserNotFound => {
                ApiError::not_found(error_codes::USER_NOT_FOUND, "User not found")
            }
            UserAuthError::WrongPassword => {
                ApiError::unauthorized(error_codes::AUTH_FAILED, "Incorrect password")
            }
            UserAuthError::Unauthorized(_) => {
                ApiError::unauthorized(error_codes::AUTH_FAILED, "Invalid token")
            }
            other @ (UserAuthError::TokenIssue(_)
            | UserAuthError::Password(_)
            | UserAuthError::Store(_)) => ApiError::internal(other),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &e {
            TransferError::InvalidAmount(_) => error_codes::INVALID_AMOUNT,
            TransferError::SameAccount(_) => error_codes::SAME_ACCOUNT,
            TransferError::Timeout(_) => error_codes::TRANSFER_TIMEOUT,
            TransferError::Cancelled => error_codes::SERVICE_UNAVAILABLE,
            TransferError::Storage(_)
            | TransferError::TransactionAborted(_)
            | TransferError::RollbackFailed { .. } => error_codes::INTERNAL_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = e.code(), error = %e, "Transfer failed");
        }
        // Storage details stay in the log
        let msg = if e.is_pre_check() || matches!(e, TransferError::Timeout(_)) {
            e.to_string()
        } else {
            format!("Transfer failed: {}", e.code())
        };
        ApiError::new(status, code, msg)
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INVALID_AMOUNT: i32 = 1002;
    pub const CURRENCY_MISMATCH: i32 = 1003;
    pub const SAME_ACCOUNT: i32 = 1004;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const TOKEN_EXPIRED: i32 = 2003;
    pub const NOT_OWNER: i32 = 2004;

    // Conflict errors (3xxx)
    pub const USER_EXISTS: i32 = 3001;
    pub const ACCOUNT_EXISTS: i32 = 3002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4000;
    pub const USER_NOT_FOUND: i32 = 4001;
    pub const ACCOUNT_NOT_FOUND: i32 = 4002;
    pub const TRANSFER_NOT_FOUND: i32 = 4003;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const TRANSFER_TIMEOUT: i32 = 5004;
}
