//! Request bodies and query strings
//!
//! Field-level rules are declared with `validator`; cross-field and
//! ownership rules live in the handlers.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::account::validation::currency_rule;
use crate::core_types::{AccountId, Amount};

/// Open a new account for the authenticated user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(custom(function = "currency_rule"))]
    #[schema(example = "USD")]
    pub currency: String,
}

/// Page through the caller's accounts
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAccountsQuery {
    /// 1-based page number
    #[validate(range(min = 1, message = "page_id must be at least 1"))]
    pub page_id: i64,
    #[validate(range(min = 5, max = 10, message = "page_size must be between 5 and 10"))]
    pub page_size: i64,
}

impl ListAccountsQuery {
    pub fn offset(&self) -> i64 {
        (self.page_id - 1) * self.page_size
    }
}

/// Move money between two accounts of the same currency
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTransferRequest {
    #[validate(range(min = 1, message = "from_account_id must be positive"))]
    pub from_account_id: AccountId,
    #[validate(range(min = 1, message = "to_account_id must be positive"))]
    pub to_account_id: AccountId,
    #[validate(range(min = 1, message = "amount must be greater than zero"))]
    pub amount: Amount,
    #[validate(custom(function = "currency_rule"))]
    #[schema(example = "USD")]
    pub currency: String,
}
