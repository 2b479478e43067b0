//! Transaction Executor
//!
//! Runs a unit of work against exactly one database transaction:
//!
//! ```text
//! begin ──▶ work(queries) ──ok──▶ commit ──▶ Ok(T)            (commit error → Storage)
//!   │            │
//!   │            ├──err──────────▶ rollback ─ok─▶ TransactionAborted
//!   │            ├──deadline─────▶ rollback ─ok─▶ Timeout
//!   │            └──cancel───────▶ rollback ─ok─▶ Cancelled
//!   │                                 └──err──▶ RollbackFailed { cause, rollback }
//!   ├──deadline──▶ Timeout     (nothing opened)
//!   └──cancel────▶ Cancelled   (nothing opened)
//! ```
//!
//! One deadline covers `begin` and the work. `commit` runs unbounded once
//! the work has finished: a commit cut off mid-flight would leave the outcome
//! unknown to the caller.
//!
//! The transaction handle never outlives the call. If the executor future
//! itself is dropped, the handle is dropped and the store rolls back.

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::error::{AbortReason, TransferError};
use crate::store::{LedgerQueries, StoreError, Store};

/// Cancellation signal observed by a running transaction
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Trigger side of a [`CancelSignal`]
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

/// Create a linked canceller / signal pair
pub fn cancel_signal() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelSignal { rx })
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the canceller is dropped first.
    async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Per-call limits for one transaction
#[derive(Debug, Clone, Default)]
pub struct TxContext {
    timeout: Option<Duration>,
    cancel: Option<CancelSignal>,
}

impl TxContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }
}

/// Execute `work` inside one transaction with commit-or-rollback semantics.
///
/// `work` is called exactly once. A context that is already cancelled is
/// rejected with `Cancelled` before any transaction is opened.
pub async fn execute_tx<T, F>(
    store: &dyn Store,
    ctx: &TxContext,
    work: F,
) -> Result<T, TransferError>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn LedgerQueries) -> BoxFuture<'t, Result<T, StoreError>> + Send,
{
    if ctx.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let deadline = ctx.timeout.map(|limit| (limit, Instant::now() + limit));

    let mut tx = match run_bounded(store.begin(), ctx, deadline).await {
        Ok(tx) => tx,
        Err(AbortReason::Store(e)) => return Err(TransferError::Storage(e)),
        Err(reason) => {
            warn!(reason = %reason, "Transaction not opened");
            return Err(TransferError::aborted(reason));
        }
    };

    let outcome = run_bounded(work(tx.queries()), ctx, deadline).await;

    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                error!(error = %e, "Commit failed");
                TransferError::Storage(e)
            })?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(reason) => match tx.rollback().await {
            Ok(()) => {
                warn!(reason = %reason, "Transaction rolled back");
                Err(TransferError::aborted(reason))
            }
            Err(rollback) => {
                error!(
                    reason = %reason,
                    rollback_error = %rollback,
                    "Rollback failed"
                );
                Err(TransferError::RollbackFailed {
                    cause: reason,
                    rollback,
                })
            }
        },
    }
}

/// Drive a future under the shared deadline and the context's cancel signal
async fn run_bounded<T, Fut>(
    work: Fut,
    ctx: &TxContext,
    deadline: Option<(Duration, Instant)>,
) -> Result<T, AbortReason>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut cancel = ctx.cancel.clone();
    let cancelled = async move {
        match cancel.as_mut() {
            Some(signal) => signal.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    let bounded = async {
        match deadline {
            Some((limit, at)) => match tokio::time::timeout_at(at, work).await {
                Ok(result) => result.map_err(AbortReason::from),
                Err(_) => Err(AbortReason::Timeout(limit)),
            },
            None => work.await.map_err(AbortReason::from),
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Err(AbortReason::Cancelled),
        result = bounded => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{CreateEntryParams, Currency};
    use crate::store::{FailPoint, MemoryStore};

    #[tokio::test]
    async fn test_commit_on_success() {
        let store = MemoryStore::new();
        let account = store.seed_account("alice", 0, Currency::Usd).await.unwrap();

        let entry = execute_tx(&store, &TxContext::new(), |q| {
            Box::pin(async move {
                q.create_entry(CreateEntryParams {
                    account_id: account.id,
                    amount: 10,
                })
                .await
            })
        })
        .await
        .unwrap();

        assert_eq!(store.entries(), vec![entry]);
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_rollback_on_work_error() {
        let store = MemoryStore::new();
        let account = store.seed_account("bob", 0, Currency::Usd).await.unwrap();

        let err = execute_tx(&store, &TxContext::new(), |q| {
            Box::pin(async move {
                q.create_entry(CreateEntryParams {
                    account_id: account.id,
                    amount: 10,
                })
                .await?;
                q.get_account(account.id + 1).await
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            TransferError::TransactionAborted(StoreError::NotFound)
        ));
        assert!(store.entries().is_empty());
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_both_errors() {
        let store = MemoryStore::new();
        store.inject_failure(FailPoint::Rollback);

        let err = execute_tx(&store, &TxContext::new(), |q| {
            Box::pin(async move { q.get_account(42).await })
        })
        .await
        .unwrap_err();

        match err {
            TransferError::RollbackFailed { cause, rollback } => {
                assert!(matches!(cause, AbortReason::Store(StoreError::NotFound)));
                assert!(matches!(rollback, StoreError::Database(_)));
            }
            other => panic!("expected RollbackFailed, got {other:?}"),
        }
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_storage_error() {
        let store = MemoryStore::new();
        let account = store.seed_account("carol", 0, Currency::Usd).await.unwrap();
        store.inject_failure(FailPoint::Commit);

        let err = execute_tx(&store, &TxContext::new(), |q| {
            Box::pin(async move {
                q.create_entry(CreateEntryParams {
                    account_id: account.id,
                    amount: 1,
                })
                .await
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Storage(StoreError::Database(_))));
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_begin_failure_is_storage_error() {
        let store = MemoryStore::new();
        store.inject_failure(FailPoint::Begin);
        let mut called = false;

        let err = execute_tx(&store, &TxContext::new(), |q| {
            called = true;
            Box::pin(async move { q.get_account(1).await })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Storage(_)));
        assert!(!called, "work must not run without a transaction");
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let store = MemoryStore::new();
        let account = store.seed_account("dave", 0, Currency::Usd).await.unwrap();
        store.set_latency(Some(Duration::from_millis(200)));

        let ctx = TxContext::new().with_timeout(Some(Duration::from_millis(20)));
        let err = execute_tx(&store, &ctx, |q| {
            Box::pin(async move {
                q.create_entry(CreateEntryParams {
                    account_id: account.id,
                    amount: 1,
                })
                .await
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Timeout(d) if d == Duration::from_millis(20)));
        assert!(err.rolled_back());
        store.set_latency(None);
        assert!(store.entries().is_empty());
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_transaction_rolls_back() {
        let store = MemoryStore::new();
        let account = store.seed_account("erin", 0, Currency::Usd).await.unwrap();
        store.set_latency(Some(Duration::from_millis(100)));

        let (canceller, signal) = cancel_signal();
        let ctx = TxContext::new().with_cancel(signal);

        let task_store = store.clone();
        let task = tokio::spawn(async move {
            execute_tx(&task_store, &ctx, |q| {
                Box::pin(async move {
                    q.create_entry(CreateEntryParams {
                        account_id: account.id,
                        amount: 1,
                    })
                    .await
                })
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        store.set_latency(None);
        assert!(store.entries().is_empty());
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_deadline_covers_begin() {
        let store = MemoryStore::new();
        store.set_begin_latency(Some(Duration::from_millis(200)));
        let mut called = false;

        let ctx = TxContext::new().with_timeout(Some(Duration::from_millis(20)));
        let err = execute_tx(&store, &ctx, |q| {
            called = true;
            Box::pin(async move { q.get_account(1).await })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Timeout(d) if d == Duration::from_millis(20)));
        assert!(!called, "work must not run after the deadline");
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_deadline_shared_between_begin_and_work() {
        let store = MemoryStore::new();
        let account = store.seed_account("gina", 0, Currency::Usd).await.unwrap();
        store.set_begin_latency(Some(Duration::from_millis(60)));
        store.set_latency(Some(Duration::from_millis(60)));

        // Each step alone fits in 100ms, both together do not
        let ctx = TxContext::new().with_timeout(Some(Duration::from_millis(100)));
        let err = execute_tx(&store, &ctx, |q| {
            Box::pin(async move {
                q.create_entry(CreateEntryParams {
                    account_id: account.id,
                    amount: 1,
                })
                .await
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Timeout(_)));
        store.set_latency(None);
        assert!(store.entries().is_empty());
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_begin() {
        let store = MemoryStore::new();
        store.set_begin_latency(Some(Duration::from_millis(200)));
        let (canceller, signal) = cancel_signal();
        let ctx = TxContext::new().with_cancel(signal);

        let task_store = store.clone();
        let task = tokio::spawn(async move {
            execute_tx(&task_store, &ctx, |q| {
                Box::pin(async move { q.get_account(1).await })
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_context_opens_nothing() {
        let store = MemoryStore::new();
        let (canceller, signal) = cancel_signal();
        canceller.cancel();

        let err = execute_tx(&store, &TxContext::new().with_cancel(signal), |q| {
            Box::pin(async move { q.get_account(1).await })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled));
        assert!(store.lock_log().is_empty());
    }
}
