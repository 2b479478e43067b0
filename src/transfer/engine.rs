//! Transfer Engine
//!
//! One transfer = five writes in one transaction:
//!
//! ```text
//! 1. INSERT transfers  {from, to, amount}
//! 2. INSERT entries    {from, -amount}
//! 3. INSERT entries    {to,   +amount}
//! 4. UPDATE accounts   lower id first   ─┐ row locks always taken in
//! 5. UPDATE accounts   higher id second ─┘ ascending account id order
//! ```
//!
//! Two transfers A→B and B→A both lock min(A,B) first, so they serialize on
//! that row instead of waiting on each other.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info, info_span, warn};
use utoipa::ToSchema;

use super::error::TransferError;
use super::executor::{TxContext, execute_tx};
use crate::account::{
    Account, AddAccountBalanceParams, CreateEntryParams, CreateTransferParams, Entry, Transfer,
};
use crate::core_types::{AccountId, Amount};
use crate::store::Store;

/// Input of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Amount,
}

/// Everything a committed transfer wrote. Account snapshots are the
/// post-update rows read back inside the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}

/// Balance updates of a transfer in lock order (ascending account id)
pub fn balance_updates(params: &TransferParams) -> [AddAccountBalanceParams; 2] {
    let debit = AddAccountBalanceParams {
        id: params.from_account_id,
        delta: -params.amount,
    };
    let credit = AddAccountBalanceParams {
        id: params.to_account_id,
        delta: params.amount,
    };
    if debit.id < credit.id {
        [debit, credit]
    } else {
        [credit, debit]
    }
}

pub struct TransferEngine {
    store: Arc<dyn Store>,
    tx_timeout: Option<Duration>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tx_timeout: None,
        }
    }

    /// Deadline applied to every transfer transaction
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Move `amount` from one account to another atomically.
    ///
    /// Account existence and currency match are the caller's checks; a
    /// missing account surfaces as a rolled back storage error.
    pub async fn transfer(&self, params: TransferParams) -> Result<TransferResult, TransferError> {
        let ctx = TxContext::new().with_timeout(self.tx_timeout);
        self.transfer_with(params, &ctx).await
    }

    /// Same as [`transfer`](Self::transfer) under an explicit context.
    /// The context's own timeout wins over the engine default.
    pub async fn transfer_with(
        &self,
        params: TransferParams,
        ctx: &TxContext,
    ) -> Result<TransferResult, TransferError> {
        if params.amount <= 0 {
            return Err(TransferError::InvalidAmount(params.amount));
        }
        if params.from_account_id == params.to_account_id {
            return Err(TransferError::SameAccount(params.from_account_id));
        }

        let ctx = if ctx.timeout().is_none() {
            ctx.clone().with_timeout(self.tx_timeout)
        } else {
            ctx.clone()
        };

        let span = info_span!(
            "transfer",
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount
        );

        let result = execute_tx(self.store.as_ref(), &ctx, move |q| {
            Box::pin(async move {
                let transfer = q
                    .create_transfer(CreateTransferParams {
                        from_account_id: params.from_account_id,
                        to_account_id: params.to_account_id,
                        amount: params.amount,
                    })
                    .await?;

                let from_entry = q
                    .create_entry(CreateEntryParams {
                        account_id: params.from_account_id,
                        amount: -params.amount,
                    })
                    .await?;

                let to_entry = q
                    .create_entry(CreateEntryParams {
                        account_id: params.to_account_id,
                        amount: params.amount,
                    })
                    .await?;

                let [first, second] = balance_updates(&params);
                let first = q.add_account_balance(first).await?;
                let second = q.add_account_balance(second).await?;

                let (from_account, to_account) = if first.id == params.from_account_id {
                    (first, second)
                } else {
                    (second, first)
                };

                Ok(TransferResult {
                    transfer,
                    from_entry,
                    to_entry,
                    from_account,
                    to_account,
                })
            })
        })
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        match &result {
            Ok(r) => info!(transfer_id = r.transfer.id, "Transfer committed"),
            Err(e) => warn!(code = e.code(), error = %e, "Transfer failed"),
        }

        result
    }
}
