//! Settlement Engine
//!
//! Computes who pays whom to clear all outstanding debts in an expense
//! group.
//!
//! # Architecture

#![forbid(unsafe_code)]
//!
//! A computation runs in three stages over one ledger snapshot:
//!
//! 1. **Authorization**: the group must exist and the requester must belong to it
//! 2. **Aggregation**: unpaid splits become one signed net balance per member
//! 3. **Netting**: balances are reduced to an ordered list of payments
//!
//! # Netting Algorithm
//!
//! Greedy two-cursor matching of the largest creditor against the largest
//! debtor:
//! - At most `n - 1` payments for `n` members with an open position
//! - Applying every payment leaves every balance at exactly zero
//! - Identical input always yields the identical payment list
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Member, MemberId, MemoryLedger, NewExpense};
//! use rust_decimal_macros::dec;
//! use settlement::{Config, SettlementEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let group = ledger.create_group(
//!         "Trip",
//!         vec![Member::new("u1", "Alice"), Member::new("u2", "Bob")],
//!     )?;
//!
//!     let dinner = NewExpense::split_evenly(
//!         "Dinner",
//!         dec!(100.00),
//!         "u1",
//!         &[MemberId::new("u1"), MemberId::new("u2")],
//!     )?;
//!     ledger.record_expense(&group, dinner)?;
//!
//!     let engine = SettlementEngine::with_store(Config::default(), ledger)?;
//!     for s in engine.calculate_settlements(&group, &MemberId::new("u1")).await? {
//!         println!("{} pays {} {}", s.from_name, s.to_name, s.amount);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod money;
pub mod balance;
pub mod netting;
pub mod metrics;
pub mod error;
pub mod config;
pub mod engine;

// Re-exports
pub use error::{Error, Result};
pub use types::*;
pub use balance::{BalanceAggregator, Balances};
pub use netting::NettingEngine;
pub use metrics::Metrics;
pub use config::Config;
pub use engine::SettlementEngine;
