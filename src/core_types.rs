//! Core types used throughout the system
//!
//! Identifiers are the `BIGSERIAL` primary keys PostgreSQL assigns, so they are
//! signed 64-bit integers end to end (API, engine, storage).

/// Account ID - globally unique, immutable after assignment.
///
/// # Lock order:
/// Balance rows are always locked in ascending `AccountId` order inside a
/// transfer transaction. Every concurrent transfer agrees on that order.
pub type AccountId = i64;

/// Entry ID - one ledger line item
pub type EntryId = i64;

/// Transfer ID - one money movement between two accounts
pub type TransferId = i64;

/// Money amount in the smallest currency unit (cents, rupiah, ...)
pub type Amount = i64;
