//! Gateway types module
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Error response with HTTP status
//!
//! ## Submodules
//! - [`request`]: Request bodies and query strings
//! - [`response`]: Response types and error codes

pub mod request;
pub mod response;

// Re-export commonly used types at module root
pub use request::{CreateAccountRequest, CreateTransferRequest, ListAccountsQuery};
pub use response::{ApiError, ApiResponse, error_codes};
