//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic ordering (member ids are totally ordered)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Error, Result, MINOR_UNIT_SCALE};

/// Member identifier (opaque, owned by the membership service)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

impl MemberId {
    /// Create new member ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Generate a fresh, time-ordered group ID
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group member as seen by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID
    pub id: MemberId,

    /// Display name
    pub name: String,
}

impl Member {
    /// Create new member
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
        }
    }
}

/// Portion of one expense attributed to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Split ID
    pub split_id: Uuid,

    /// Member who owes this portion
    pub member: MemberId,

    /// Owed amount (`None` when storage holds no amount)
    pub amount: Option<Decimal>,

    /// Already settled outside the ledger
    pub paid: bool,
}

/// Expense logged by a group member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID
    pub expense_id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Free-form description
    pub description: String,

    /// Total amount (exact decimal, >= 0)
    pub amount: Decimal,

    /// Member who paid
    pub paid_by: MemberId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Splits, in insertion order
    pub splits: Vec<Split>,
}

impl Expense {
    /// Sum of all split amounts (absent amounts count as zero)
    pub fn split_total(&self) -> Decimal {
        self.splits.iter().filter_map(|s| s.amount).sum()
    }

    /// Splits not yet marked as paid
    pub fn unpaid_splits(&self) -> impl Iterator<Item = &Split> + '_ {
        self.splits.iter().filter(|s| !s.paid)
    }

    /// Find a split by ID
    pub fn split(&self, split_id: Uuid) -> Option<&Split> {
        self.splits.iter().find(|s| s.split_id == split_id)
    }
}

/// Split request for a new expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSplit {
    /// Member who owes this portion
    pub member: MemberId,

    /// Owed amount
    pub amount: Decimal,
}

impl NewSplit {
    /// Create new split request
    pub fn new(member: impl Into<String>, amount: Decimal) -> Self {
        Self {
            member: MemberId::new(member),
            amount,
        }
    }
}

/// Expense submission, validated by the ledger before it is recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    /// Free-form description
    pub description: String,

    /// Total amount
    pub amount: Decimal,

    /// Member who paid
    pub paid_by: MemberId,

    /// Requested splits
    pub splits: Vec<NewSplit>,
}

impl NewExpense {
    /// Create an expense with explicit splits
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        paid_by: impl Into<String>,
        splits: Vec<NewSplit>,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            paid_by: MemberId::new(paid_by),
            splits,
        }
    }

    /// Create an expense split evenly between `members`.
    ///
    /// Shares are truncated to the minor unit; leftover cents go to the first
    /// members in the given order, one cent each, so the splits always sum
    /// to `amount` exactly.
    pub fn split_evenly(
        description: impl Into<String>,
        amount: Decimal,
        paid_by: impl Into<String>,
        members: &[MemberId],
    ) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::InvalidExpense(
                "cannot split an expense between zero members".to_string(),
            ));
        }
        ensure_quantized(amount)?;

        let unit = Decimal::new(1, MINOR_UNIT_SCALE);
        let count = Decimal::from(members.len() as u64);
        let share = (amount / count)
            .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::ToZero);
        let mut remainder = amount - share * count;

        let splits = members
            .iter()
            .map(|member| {
                let mut owed = share;
                if remainder >= unit {
                    owed += unit;
                    remainder -= unit;
                }
                NewSplit {
                    member: member.clone(),
                    amount: owed,
                }
            })
            .collect();

        Ok(Self {
            description: description.into(),
            amount,
            paid_by: MemberId::new(paid_by),
            splits,
        })
    }

    /// Sum of the requested split amounts
    pub fn split_total(&self) -> Decimal {
        self.splits.iter().map(|s| s.amount).sum()
    }
}

/// Check that `amount` has no digits below `scale` decimal places
pub fn is_quantized(amount: Decimal, scale: u32) -> bool {
    amount.round_dp(scale) == amount
}

/// Reject negative amounts and amounts finer than the minor unit
pub fn ensure_quantized(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount(format!("{} is negative", amount)));
    }
    if !is_quantized(amount, MINOR_UNIT_SCALE) {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, MINOR_UNIT_SCALE
        )));
    }
    Ok(())
}
