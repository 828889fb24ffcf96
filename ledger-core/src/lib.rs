//! Splitledger Ledger Core
//!
//! Domain model and storage ports for a shared-expense ledger.
//!
//! # Architecture
//!
//! - **Types**: members, groups, expenses and their splits
//! - **Ports**: read-side traits the settlement core depends on
//! - **Memory ledger**: reference implementation of the ports with the
//!   expense-recording rules of the ledger

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]
//!
//! # Invariants
//!
//! - Split conservation: Σ(split amounts) == expense amount for every expense
//! - Amounts are exact decimals quantized to the currency minor unit
//! - Consistent reads: an expense is never visible without its splits

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod ledger;
pub mod error;

// Re-exports
pub use error::{Error, Result};
pub use types::{Expense, GroupId, Member, MemberId, NewExpense, NewSplit, Split};
pub use storage::{ExpenseStore, GroupDirectory, GroupSnapshot};
pub use ledger::MemoryLedger;

/// Decimal places of the currency minor unit (cents)
pub const MINOR_UNIT_SCALE: u32 = 2;
