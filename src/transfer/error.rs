//! Transfer Error Types
//!
//! Every failure path of a transfer tells the caller which of two cases it is in:
//! - **pre-check rejection**: no transaction was ever opened
//! - **rolled back**: a transaction was opened and fully rolled back
//!
//! Both leave the ledger unchanged. `RollbackFailed` is the one case where the
//! server could not confirm the rollback; it carries both errors.

use std::time::Duration;
use thiserror::Error;

use crate::core_types::{AccountId, Amount};
use crate::store::StoreError;

/// Why a transaction was rolled back
#[derive(Error, Debug)]
pub enum AbortReason {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("transaction exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("transaction cancelled by caller")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum TransferError {
    // === Pre-check rejections (nothing opened) ===
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Amount),

    #[error("Source and destination account are the same: {0}")]
    SameAccount(AccountId),

    // === Storage ===
    /// Begin or commit failed, or a non-transactional call failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    // === Rolled back ===
    #[error("Transaction aborted and rolled back: {0}")]
    TransactionAborted(#[source] StoreError),

    #[error("Transaction timed out after {0:?} and was rolled back")]
    Timeout(Duration),

    #[error("Transaction cancelled and rolled back")]
    Cancelled,

    // === Rollback itself failed ===
    #[error("Rollback failed ({rollback}) after: {cause}")]
    RollbackFailed {
        #[source]
        cause: AbortReason,
        rollback: StoreError,
    },
}

impl TransferError {
    /// Error for a transaction that was rolled back successfully
    pub fn aborted(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Store(e) => TransferError::TransactionAborted(e),
            AbortReason::Timeout(d) => TransferError::Timeout(d),
            AbortReason::Cancelled => TransferError::Cancelled,
        }
    }

    /// Rejected before any transaction was opened
    pub fn is_pre_check(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidAmount(_) | TransferError::SameAccount(_)
        )
    }

    /// The transaction was confirmed rolled back, or the deadline or cancel
    /// signal fired before it opened
    pub fn rolled_back(&self) -> bool {
        matches!(
            self,
            TransferError::TransactionAborted(_)
                | TransferError::Timeout(_)
                | TransferError::Cancelled
        )
    }

    /// The underlying storage error, if there is one
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            TransferError::Storage(e) | TransferError::TransactionAborted(e) => Some(e),
            TransferError::RollbackFailed {
                cause: AbortReason::Store(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::SameAccount(_) => "SAME_ACCOUNT",
            TransferError::Storage(_) => "STORAGE_ERROR",
            TransferError::TransactionAborted(_) => "TRANSACTION_ABORTED",
            TransferError::Timeout(_) => "TIMEOUT",
            TransferError::Cancelled => "CANCELLED",
            TransferError::RollbackFailed { .. } => "ROLLBACK_FAILED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidAmount(_) | TransferError::SameAccount(_) => 400,
            TransferError::Timeout(_) => 504,
            TransferError::Cancelled => 503,
            TransferError::Storage(_)
            | TransferError::TransactionAborted(_)
            | TransferError::RollbackFailed { .. } => 500,
        }
    }
}
