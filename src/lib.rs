//! Simple Bank - ledger backend with an atomic money transfer engine
//!
//! # Modules
//!
//! - [`core_types`] - Identifier and amount aliases
//! - [`account`] - Ledger rows (users, accounts, entries, transfers) and validation
//! - [`store`] - Ledger store traits, PostgreSQL and in-memory implementations
//! - [`transfer`] - Transaction executor and transfer engine
//! - [`token`] - Access token issuing and verification
//! - [`user_auth`] - Registration, login, bearer middleware
//! - [`gateway`] - HTTP API (axum)
//! - [`db`] - Connection pool and schema
//! - [`config`] / [`logging`] - Runtime configuration and tracing setup
//! - [`random`] - Seedable random test data

// Core types - must be first!
pub mod core_types;

// Ledger
pub mod account;
pub mod store;
pub mod transfer;

// Surfaces
pub mod gateway;
pub mod token;
pub mod user_auth;

// Infrastructure
pub mod config;
pub mod db;
pub mod logging;
pub mod random;

// Convenient re-exports at crate root
pub use account::{Account, Currency, Entry, Transfer, User};
pub use core_types::{AccountId, Amount, EntryId, TransferId};
pub use store::{MemoryStore, PgStore, Store, StoreError};
pub use transfer::{TransferEngine, TransferError, TransferParams, TransferResult};
