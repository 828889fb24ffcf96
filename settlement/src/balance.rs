//! Balance aggregation
//!
//! Turns a group's expenses into one signed net balance per member.
//!
//! # Rules
//!
//! For every expense paid by `P` and every split `(M, A)` of it:
//!
//! - paid splits are skipped (settled outside the ledger)
//! - splits without an amount, or with `A <= 0`, are skipped
//! - splits where `M == P` are skipped
//! - otherwise `balance[P] += A` and `balance[M] -= A`
//!
//! Each credit is paired with an equal debit, so balances always sum to
//! zero.

use crate::{
    money::{checked_add, checked_sub, ensure_minor_units},
    types::Transfer,
    Error, Result,
};
use ledger_core::{Expense, MemberId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Net balances of a group, keyed by member ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    entries: BTreeMap<MemberId, Decimal>,
    obligation_count: usize,
    gross_amount: Decimal,
}

impl Balances {
    /// Zero balance for every member
    pub fn new<I>(members: I) -> Self
    where
        I: IntoIterator<Item = MemberId>,
    {
        Self {
            entries: members.into_iter().map(|m| (m, Decimal::ZERO)).collect(),
            obligation_count: 0,
            gross_amount: Decimal::ZERO,
        }
    }

    /// Balance of a member, if the member is known
    pub fn get(&self, member: &MemberId) -> Option<Decimal> {
        self.entries.get(member).copied()
    }

    /// Iterate in member-ID order
    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, Decimal)> + '_ {
        self.entries.iter().map(|(m, b)| (m, *b))
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No members at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unpaid splits that contributed
    pub fn obligation_count(&self) -> usize {
        self.obligation_count
    }

    /// Sum of contributing split amounts
    pub fn gross_amount(&self) -> Decimal {
        self.gross_amount
    }

    /// Sum of all balances (zero for a consistent ledger)
    pub fn total(&self) -> Result<Decimal> {
        crate::money::checked_sum(self.entries.values().copied())
    }

    /// Every balance is exactly zero
    pub fn is_settled(&self) -> bool {
        self.entries.values().all(|b| b.is_zero())
    }

    /// Members with a non-zero balance
    pub fn open_positions(&self) -> usize {
        self.entries.values().filter(|b| !b.is_zero()).count()
    }

    /// Record that `debtor` owes `creditor` the given amount
    pub fn record_obligation(
        &mut self,
        creditor: &MemberId,
        debtor: &MemberId,
        amount: Decimal,
    ) -> Result<()> {
        if creditor == debtor {
            return Ok(());
        }

        let credit = checked_add(self.balance_of(creditor)?, amount)?;
        let debit = checked_sub(self.balance_of(debtor)?, amount)?;
        self.gross_amount = checked_add(self.gross_amount, amount)?;

        self.entries.insert(creditor.clone(), credit);
        self.entries.insert(debtor.clone(), debit);
        self.obligation_count += 1;
        Ok(())
    }

    /// Apply a payment: the debtor's balance rises, the creditor's falls
    pub fn apply(&mut self, transfer: &Transfer) -> Result<()> {
        let debtor = checked_add(self.balance_of(&transfer.debtor)?, transfer.amount)?;
        let creditor = checked_sub(self.balance_of(&transfer.creditor)?, transfer.amount)?;

        self.entries.insert(transfer.debtor.clone(), debtor);
        self.entries.insert(transfer.creditor.clone(), creditor);
        Ok(())
    }

    fn balance_of(&self, member: &MemberId) -> Result<Decimal> {
        self.get(member)
            .ok_or_else(|| Error::Forbidden(format!("{} is not a member of this group", member)))
    }
}

impl FromIterator<(MemberId, Decimal)> for Balances {
    fn from_iter<T: IntoIterator<Item = (MemberId, Decimal)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            obligation_count: 0,
            gross_amount: Decimal::ZERO,
        }
    }
}

/// Balance aggregator
#[derive(Debug, Clone)]
pub struct BalanceAggregator {
    /// Minor unit scale
    scale: u32,
}

impl BalanceAggregator {
    /// Create new aggregator
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    /// Compute net balances for `members` from `expenses`.
    ///
    /// Fails with `Forbidden` if a contributing split or its payer is not
    /// one of `members`, and with `InvalidAmount` if a contributing amount
    /// is finer than the minor unit.
    pub fn aggregate(&self, members: &[MemberId], expenses: &[Expense]) -> Result<Balances> {
        let mut balances = Balances::new(members.iter().cloned());

        for expense in expenses {
            let payer = &expense.paid_by;

            for split in &expense.splits {
                if split.paid {
                    continue;
                }

                let amount = match split.amount {
                    Some(amount) if amount > Decimal::ZERO => amount,
                    _ => continue,
                };

                if &split.member == payer {
                    continue;
                }

                ensure_minor_units(amount, self.scale, "split amount")?;
                balances.record_obligation(payer, &split.member, amount)?;
            }
        }

        tracing::debug!(
            members = balances.len(),
            obligations = balances.obligation_count(),
            gross = %balances.gross_amount(),
            "Balances aggregated"
        );

        Ok(balances)
    }
}
