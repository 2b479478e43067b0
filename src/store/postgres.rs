//! PostgreSQL Ledger Store
//!
//! All queries run on a `&mut PgConnection`, which is either a pooled
//! connection (autocommit) or the connection owned by an open transaction.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::ops::DerefMut;

use super::{LedgerQueries, Store, StoreError, StoreTx};
use crate::account::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, User,
};
use crate::core_types::{AccountId, EntryId, TransferId};

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";
const USER_COLUMNS: &str =
    "username, hashed_password, full_name, email, password_changed_at, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn connection(&self) -> Result<Box<dyn LedgerQueries>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgQueries(conn)))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx(PgQueries(tx))))
    }
}

/// Open PostgreSQL transaction. Dropping it without `commit()` rolls back.
pub struct PgTx(PgQueries<Transaction<'static, Postgres>>);

#[async_trait]
impl StoreTx for PgTx {
    fn queries(&mut self) -> &mut dyn LedgerQueries {
        &mut self.0
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.0.0.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.0.0.rollback().await?;
        Ok(())
    }
}

/// Query set over anything that derefs to a `PgConnection`
pub struct PgQueries<C>(C);

#[async_trait]
impl<C> LedgerQueries for PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create_account(
        &mut self,
        params: CreateAccountParams,
    ) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (owner, balance, currency) VALUES ($1, $2, $3) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(&params.owner)
            .bind(params.balance)
            .bind(params.currency.as_str())
            .fetch_one(&mut *self.0)
            .await?;
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 LIMIT 1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(account)
    }

    async fn list_accounts(
        &mut self,
        params: ListAccountsParams,
    ) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE owner = $1 \
             ORDER BY id LIMIT $2 OFFSET $3"
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(&params.owner)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&mut *self.0)
            .await?;
        Ok(accounts)
    }

    async fn add_account_balance(
        &mut self,
        params: AddAccountBalanceParams,
    ) -> Result<Account, StoreError> {
        // Single statement: the row lock and the increment happen together
        let sql = format!(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(params.delta)
            .bind(params.id)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(account)
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.0)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, StoreError> {
        let sql = format!(
            "INSERT INTO entries (account_id, amount) VALUES ($1, $2) RETURNING {ENTRY_COLUMNS}"
        );
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(params.account_id)
            .bind(params.amount)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(entry)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1 LIMIT 1");
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(id)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(entry)
    }

    async fn list_entries(&mut self, params: ListEntriesParams) -> Result<Vec<Entry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE account_id = $1 \
             ORDER BY id LIMIT $2 OFFSET $3"
        );
        let entries = sqlx::query_as::<_, Entry>(&sql)
            .bind(params.account_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&mut *self.0)
            .await?;
        Ok(entries)
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        let sql = format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount) VALUES ($1, $2, $3) \
             RETURNING {TRANSFER_COLUMNS}"
        );
        let transfer = sqlx::query_as::<_, Transfer>(&sql)
            .bind(params.from_account_id)
            .bind(params.to_account_id)
            .bind(params.amount)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1 LIMIT 1");
        let transfer = sqlx::query_as::<_, Transfer>(&sql)
            .bind(id)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(transfer)
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers \
             WHERE from_account_id = $1 OR to_account_id = $2 \
             ORDER BY id LIMIT $3 OFFSET $4"
        );
        let transfers = sqlx::query_as::<_, Transfer>(&sql)
            .bind(params.from_account_id)
            .bind(params.to_account_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&mut *self.0)
            .await?;
        Ok(transfers)
    }

    async fn create_user(&mut self, params: CreateUserParams) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, hashed_password, full_name, email) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&params.username)
            .bind(&params.hashed_password)
            .bind(&params.full_name)
            .bind(&params.email)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(user)
    }

    async fn get_user(&mut self, username: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_one(&mut *self.0)
            .await?;
        Ok(user)
    }
}
