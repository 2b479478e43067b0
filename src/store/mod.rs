//! Ledger Store
//!
//! Capability traits the transfer engine and the API depend on, plus two
//! implementations:
//! - [`PgStore`] - PostgreSQL via `sqlx` (production)
//! - [`MemoryStore`] - in-process fake with the same atomicity and row-lock
//!   contract (tests)
//!
//! # Handles
//!
//! ```text
//! Store::connection() ──▶ Box<dyn LedgerQueries>   autocommit, one statement at a time
//! Store::begin()      ──▶ Box<dyn StoreTx>         queries() + commit() / rollback()
//! ```
//!
//! A `StoreTx` dropped without `commit()` is rolled back.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::account::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, User,
};
use crate::core_types::{AccountId, EntryId, TransferId};

/// Primitive row operations on the ledger tables.
///
/// Every method is a single statement. On a transactional handle the
/// statement runs inside that transaction and row locks it takes are held
/// until commit or rollback.
#[async_trait]
pub trait LedgerQueries: Send {
    // === Accounts ===
    async fn create_account(&mut self, params: CreateAccountParams)
    -> Result<Account, StoreError>;

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError>;

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError>;

    /// `balance = balance + delta` in one statement; returns the updated row.
    ///
    /// Takes the row lock on the account. Concurrent increments never lose
    /// an update.
    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError>;

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    // === Entries ===
    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError>;

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError>;

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError>;

    // === Transfers ===
    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError>;

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError>;

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError>;

    // === Users ===
    async fn create_user(&mut self, params: CreateUserParams) -> Result<User, StoreError>;

    async fn get_user(&mut self, username: &str) -> Result<User, StoreError>;
}

/// One open database transaction.
#[async_trait]
pub trait StoreTx: Send {
    /// Query handle bound to this transaction
    fn queries(&mut self) -> &mut dyn LedgerQueries;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Storage capability. The engine and the API only ever see this trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// Non-transactional handle (each statement autocommits)
    async fn connection(&self) -> Result<Box<dyn LedgerQueries>, StoreError>;

    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}
