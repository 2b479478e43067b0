//! In-Memory Ledger Store
//!
//! Test double for [`PgStore`](super::PgStore) that keeps the contract the
//! transfer engine relies on:
//! - **Atomicity**: a transaction buffers its writes and publishes them in one
//!   step on commit; rollback (or drop) discards them.
//! - **Row locks**: `add_account_balance` takes an exclusive per-account lock
//!   that is held until the transaction ends, exactly like
//!   `UPDATE ... SET balance = balance + $1` in PostgreSQL. Acquiring two
//!   locks in opposite orders from two transactions really does deadlock.
//! - **Constraints**: foreign keys and unique keys of the SQL schema are
//!   checked and reported with the same `StoreError` variants.
//!
//! Ids come from sequences that are never rolled back, as in PostgreSQL.
//! Reads inside a transaction see its own writes; other handles only see
//! committed rows.
//!
//! Failures and latency can be injected per statement kind with
//! [`FailPoint`] and [`MemoryStore::set_latency`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use super::{LedgerQueries, Store, StoreError, StoreTx};
use crate::account::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Currency, Entry, ListAccountsParams,
    ListEntriesParams, ListTransfersParams, Transfer, User,
};
use crate::core_types::{AccountId, Amount, EntryId, TransferId};

/// Statement kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    CreateTransfer,
    CreateEntry,
    AddAccountBalance,
    Commit,
    Rollback,
}

/// One row-lock acquisition, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    pub tx_id: u64,
    pub account_id: AccountId,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
    account_seq: i64,
    entry_seq: i64,
    transfer_seq: i64,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>,
    fail_points: Mutex<HashSet<FailPoint>>,
    latency: Mutex<Option<Duration>>,
    begin_latency: Mutex<Option<Duration>>,
    lock_log: Mutex<Vec<LockEvent>>,
    tx_seq: AtomicU64,
    open_txs: AtomicUsize,
}

/// Shared, cloneable in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every statement of this kind fail until cleared
    pub fn inject_failure(&self, point: FailPoint) {
        lock(&self.inner.fail_points).insert(point);
    }

    pub fn clear_failures(&self) {
        lock(&self.inner.fail_points).clear();
    }

    /// Sleep before every statement (widens race windows, drives timeouts)
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.inner.latency) = latency;
    }

    /// Sleep inside `begin()` before the transaction opens (slow pool acquire)
    pub fn set_begin_latency(&self, latency: Option<Duration>) {
        *lock(&self.inner.begin_latency) = latency;
    }

    /// Transactions opened with `begin()` and not yet committed, rolled back or dropped
    pub fn open_transactions(&self) -> usize {
        self.inner.open_txs.load(Ordering::SeqCst)
    }

    /// Every row lock taken so far
    pub fn lock_log(&self) -> Vec<LockEvent> {
        lock(&self.inner.lock_log).clone()
    }

    /// Committed account row
    pub fn account(&self, id: AccountId) -> Option<Account> {
        lock(&self.inner.tables).accounts.get(&id).cloned()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        lock(&self.inner.tables).transfers.values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<Entry> {
        lock(&self.inner.tables).entries.values().cloned().collect()
    }

    /// Create the owner (if missing) and an account with an opening balance.
    pub async fn seed_account(
        &self,
        owner: &str,
        balance: Amount,
        currency: Currency,
    ) -> Result<Account, StoreError> {
        let mut conn = self.connection().await?;
        match conn.get_user(owner).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                conn.create_user(CreateUserParams {
                    username: owner.to_string(),
                    hashed_password: String::new(),
                    full_name: owner.to_string(),
                    email: format!("{owner}@example.com"),
                })
                .await?;
            }
            Err(e) => return Err(e),
        }
        conn.create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency,
        })
        .await
    }

    fn new_tx(&self) -> MemTx {
        MemTx {
            inner: self.inner.clone(),
            id: self.inner.tx_seq.fetch_add(1, Ordering::SeqCst) + 1,
            staged: Staged::default(),
            held: HashMap::new(),
            explicit: false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn connection(&self) -> Result<Box<dyn LedgerQueries>, StoreError> {
        Ok(Box::new(MemConn { store: self.clone() }))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let begin_latency = *lock(&self.inner.begin_latency);
        if let Some(d) = begin_latency {
            tokio::time::sleep(d).await;
        }
        self.inner.check(FailPoint::Begin)?;
        let mut tx = self.new_tx();
        tx.explicit = true;
        self.inner.open_txs.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(tx))
    }
}

impl Inner {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if lock(&self.fail_points).contains(&point) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }

    async fn pause(&self) {
        let latency = *lock(&self.latency);
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }

    fn row_lock(&self, id: AccountId) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.row_locks).entry(id).or_default().clone()
    }
}

/// A poisoned mutex only means a test panicked while holding it; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Transaction
// ============================================================================

#[derive(Default)]
struct Staged {
    users: BTreeMap<String, User>,
    accounts: BTreeMap<AccountId, Account>,
    deleted_accounts: HashSet<AccountId>,
    balance_deltas: BTreeMap<AccountId, Amount>,
    entries: BTreeMap<EntryId, Entry>,
    transfers: BTreeMap<TransferId, Transfer>,
}

struct MemTx {
    inner: Arc<Inner>,
    id: u64,
    staged: Staged,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    explicit: bool,
}

impl MemTx {
    /// Account as this transaction sees it
    fn visible_account(&self, tables: &Tables, id: AccountId) -> Option<Account> {
        if self.staged.deleted_accounts.contains(&id) {
            return None;
        }
        let mut account = self
            .staged
            .accounts
            .get(&id)
            .or_else(|| tables.accounts.get(&id))
            .cloned()?;
        account.balance += self.staged.balance_deltas.get(&id).copied().unwrap_or(0);
        Some(account)
    }

    fn visible_user(&self, tables: &Tables, username: &str) -> Option<User> {
        self.staged
            .users
            .get(username)
            .or_else(|| tables.users.get(username))
            .cloned()
    }

    fn visible_accounts(&self, tables: &Tables) -> Vec<Account> {
        let ids: HashSet<AccountId> = tables
            .accounts
            .keys()
            .chain(self.staged.accounts.keys())
            .copied()
            .collect();
        let mut accounts: Vec<Account> = ids
            .into_iter()
            .filter_map(|id| self.visible_account(tables, id))
            .collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    async fn acquire_row_lock(&mut self, id: AccountId) {
        if self.held.contains_key(&id) {
            return;
        }
        let guard = self.inner.row_lock(id).lock_owned().await;
        lock(&self.inner.lock_log).push(LockEvent {
            tx_id: self.id,
            account_id: id,
        });
        self.held.insert(id, guard);
    }

    /// Publish the write set. Row locks are released afterwards, when the guards drop.
    fn apply(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        let mut tables = lock(&self.inner.tables);
        tables.users.extend(staged.users);
        tables.accounts.extend(staged.accounts);
        for id in &staged.deleted_accounts {
            tables.accounts.remove(id);
        }
        for (id, delta) in staged.balance_deltas {
            if let Some(account) = tables.accounts.get_mut(&id) {
                account.balance += delta;
            }
        }
        tables.entries.extend(staged.entries);
        tables.transfers.extend(staged.transfers);
    }

    fn discard(&mut self) {
        self.staged = Staged::default();
        self.held.clear();
    }
}

impl Drop for MemTx {
    fn drop(&mut self) {
        if self.explicit {
            self.inner.open_txs.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl StoreTx for MemTx {
    fn queries(&mut self) -> &mut dyn LedgerQueries {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.inner.pause().await;
        if let Err(e) = tx.inner.check(FailPoint::Commit) {
            // A failed COMMIT leaves nothing behind
            tx.discard();
            return Err(e);
        }
        tx.apply();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.discard();
        tx.inner.check(FailPoint::Rollback)
    }
}

#[async_trait]
impl LedgerQueries for MemTx {
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, StoreError> {
        self.inner.pause().await;
        let mut tables = lock(&self.inner.tables);

        if self.visible_user(&tables, &params.owner).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                "accounts_owner_fkey".to_string(),
            ));
        }
        if self
            .visible_accounts(&tables)
            .iter()
            .any(|a| a.owner == params.owner && a.currency == params.currency)
        {
            return Err(StoreError::UniqueViolation("owner_currency_key".to_string()));
        }

        tables.account_seq += 1;
        let account = Account {
            id: tables.account_seq,
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.staged.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        self.visible_account(&tables, id).ok_or(StoreError::NotFound)
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        Ok(self
            .visible_accounts(&tables)
            .into_iter()
            .filter(|a| a.owner == params.owner)
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .collect())
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        self.inner.pause().await;
        self.inner.check(FailPoint::AddAccountBalance)?;

        // UPDATE on a missing row matches nothing and takes no lock
        {
            let tables = lock(&self.inner.tables);
            if self.visible_account(&tables, params.id).is_none() {
                return Err(StoreError::NotFound);
            }
        }

        self.acquire_row_lock(params.id).await;

        // Re-read after the lock: the latest committed balance is the base
        let tables = lock(&self.inner.tables);
        if self.visible_account(&tables, params.id).is_none() {
            return Err(StoreError::NotFound);
        }
        *self.staged.balance_deltas.entry(params.id).or_insert(0) += params.delta;
        self.visible_account(&tables, params.id)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        if self.visible_account(&tables, id).is_none() {
            return Err(StoreError::NotFound);
        }
        let referenced = tables
            .entries
            .values()
            .chain(self.staged.entries.values())
            .any(|e| e.account_id == id)
            || tables
                .transfers
                .values()
                .chain(self.staged.transfers.values())
                .any(|t| t.from_account_id == id || t.to_account_id == id);
        if referenced {
            return Err(StoreError::ForeignKeyViolation(
                "entries_account_id_fkey".to_string(),
            ));
        }
        self.staged.accounts.remove(&id);
        self.staged.deleted_accounts.insert(id);
        Ok(())
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        self.inner.pause().await;
        self.inner.check(FailPoint::CreateEntry)?;
        let mut tables = lock(&self.inner.tables);

        if self.visible_account(&tables, params.account_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                "entries_account_id_fkey".to_string(),
            ));
        }

        tables.entry_seq += 1;
        let entry = Entry {
            id: tables.entry_seq,
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.staged.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        self.staged
            .entries
            .get(&id)
            .or_else(|| tables.entries.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        let mut entries: Vec<Entry> = tables
            .entries
            .values()
            .chain(self.staged.entries.values())
            .filter(|e| e.account_id == params.account_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id);
        Ok(entries
            .into_iter()
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .collect())
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        self.inner.pause().await;
        self.inner.check(FailPoint::CreateTransfer)?;
        let mut tables = lock(&self.inner.tables);

        if self.visible_account(&tables, params.from_account_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                "transfers_from_account_id_fkey".to_string(),
            ));
        }
        if self.visible_account(&tables, params.to_account_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                "transfers_to_account_id_fkey".to_string(),
            ));
        }

        tables.transfer_seq += 1;
        let transfer = Transfer {
            id: tables.transfer_seq,
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.staged.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        self.staged
            .transfers
            .get(&id)
            .or_else(|| tables.transfers.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        let mut transfers: Vec<Transfer> = tables
            .transfers
            .values()
            .chain(self.staged.transfers.values())
            .filter(|t| {
                t.from_account_id == params.from_account_id
                    || t.to_account_id == params.to_account_id
            })
            .cloned()
            .collect();
        transfers.sort_by_key(|t| t.id);
        Ok(transfers
            .into_iter()
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .collect())
    }

    async fn create_user(&mut self, params: CreateUserParams) -> Result<User, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);

        if self.visible_user(&tables, &params.username).is_some() {
            return Err(StoreError::UniqueViolation("users_pkey".to_string()));
        }
        let email_taken = tables
            .users
            .values()
            .chain(self.staged.users.values())
            .any(|u| u.email == params.email);
        if email_taken {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            username: params.username,
            hashed_password: params.hashed_password,
            full_name: params.full_name,
            email: params.email,
            password_changed_at: now,
            created_at: now,
        };
        self.staged.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&mut self, username: &str) -> Result<User, StoreError> {
        self.inner.pause().await;
        let tables = lock(&self.inner.tables);
        self.visible_user(&tables, username)
            .ok_or(StoreError::NotFound)
    }
}

// ============================================================================
// Autocommit handle
// ============================================================================

/// Runs every statement in its own implicit transaction
struct MemConn {
    store: MemoryStore,
}

impl MemConn {
    /// Commit an implicit transaction. Injected COMMIT failures only apply to `begin()` transactions.
    fn finish<T>(mut tx: MemTx, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if result.is_ok() {
            tx.apply();
        }
        result
    }
}

#[async_trait]
impl LedgerQueries for MemConn {
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.create_account(params).await;
        Self::finish(tx, result)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        self.store.new_tx().get_account(id).await
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        self.store.new_tx().list_accounts(params).await
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.add_account_balance(params).await;
        Self::finish(tx, result)
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.delete_account(id).await;
        Self::finish(tx, result)
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.create_entry(params).await;
        Self::finish(tx, result)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        self.store.new_tx().get_entry(id).await
    }

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        self.store.new_tx().list_entries(params).await
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.create_transfer(params).await;
        Self::finish(tx, result)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        self.store.new_tx().get_transfer(id).await
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        self.store.new_tx().list_transfers(params).await
    }

    async fn create_user(&mut self, params: CreateUserParams) -> Result<User, StoreError> {
        let mut tx = self.store.new_tx();
        let result = tx.create_user(params).await;
        Self::finish(tx, result)
    }

    async fn get_user(&mut self, username: &str) -> Result<User, StoreError> {
        self.store.new_tx().get_user(username).await
    }
}
