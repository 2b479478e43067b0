//! Money Transfer
//!
//! # Architecture
//!
//! ```text
//! API handler ──▶ TransferEngine::transfer ──▶ execute_tx ──▶ Store::begin
//!                   │ pre-checks                 │ timeout / cancel
//!                   │ (amount, same account)     │ commit or rollback
//!                   └─ five writes, lower account id locked first
//! ```
//!
//! # Guarantees
//!
//! 1. **All-or-nothing**: the transfer row, both entries and both balance
//!    updates commit together or not at all
//! 2. **Lock order**: balance updates always touch the lower account id first
//! 3. **No retries**: a failed call is reported, never replayed internally

pub mod engine;
pub mod error;
pub mod executor;


pub use engine::{TransferEngine, TransferParams, TransferResult, balance_updates};
pub use error::{AbortReason, TransferError};
pub use executor::{CancelSignal, Canceller, TxContext, cancel_signal, execute_tx};
