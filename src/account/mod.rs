//! Account management module
//!
//! Ledger row types (users, accounts, entries, transfers) and input validation.

pub mod models;
pub mod validation;

// Re-export commonly used types
pub use models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, User,
};
pub use validation::{Currency, ValidationError, validate_username};
