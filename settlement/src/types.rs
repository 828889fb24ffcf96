//! Core types for settlement computation

use chrono::{DateTime, Utc};
use ledger_core::{GroupId, MemberId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment between two members produced by the netting stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Member who pays
    pub debtor: MemberId,

    /// Member who receives
    pub creditor: MemberId,

    /// Amount (always > 0)
    pub amount: Decimal,
}

/// Payment instruction returned to callers, with display names resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInstruction {
    /// Paying member
    pub from_member_id: MemberId,

    /// Paying member display name
    pub from_name: String,

    /// Receiving member
    pub to_member_id: MemberId,

    /// Receiving member display name
    pub to_name: String,

    /// Amount to transfer
    pub amount: Decimal,
}

/// Net position of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    /// Member ID
    pub member_id: MemberId,

    /// Display name
    pub name: String,

    /// Net balance (positive = is owed, negative = owes)
    pub balance: Decimal,
}

impl MemberBalance {
    /// Owes money to the group
    pub fn is_debtor(&self) -> bool {
        self.balance < Decimal::ZERO
    }

    /// Is owed money by the group
    pub fn is_creditor(&self) -> bool {
        self.balance > Decimal::ZERO
    }
}

/// Netting statistics for one computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// Group members considered
    pub member_count: usize,

    /// Unpaid splits that contributed to balances
    pub obligation_count: usize,

    /// Sum of those splits (what would move without netting)
    pub gross_amount: Decimal,

    /// Number of payments after netting
    pub payment_count: usize,

    /// Sum of payments after netting
    pub net_amount: Decimal,
}

impl SettlementSummary {
    /// Amount that no longer needs to move thanks to netting
    pub fn amount_saved(&self) -> Decimal {
        self.gross_amount - self.net_amount
    }

    /// Obligations eliminated by netting
    pub fn transfers_eliminated(&self) -> usize {
        self.obligation_count.saturating_sub(self.payment_count)
    }
}

/// Full result of a settlement computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Group the plan settles
    pub group_id: GroupId,

    /// Ordered payments
    pub settlements: Vec<SettlementInstruction>,

    /// Statistics
    pub summary: SettlementSummary,

    /// Computation timestamp
    pub computed_at: DateTime<Utc>,
}
