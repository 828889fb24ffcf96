//! In-memory ledger
//!
//! Reference implementation of the storage ports. Holds groups and their
//! expenses behind a single `RwLock`, so every read is a consistent
//! snapshot: an expense and all of its splits are always observed together.
//!
//! # Example
//!
//! ```
//! use ledger_core::{GroupDirectory, Member, MemoryLedger, NewExpense, NewSplit};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> ledger_core::Result<()> {
//! let ledger = MemoryLedger::new();
//! let group = ledger.create_group("flat", vec![Member::new("a", "Alice"), Member::new("b", "Bob")])?;
//!
//! ledger.record_expense(
//!     &group,
//!     NewExpense::new(
//!         "rent",
//!         Decimal::new(100, 0),
//!         "a",
//!         vec![NewSplit::new("a", Decimal::new(50, 0)), NewSplit::new("b", Decimal::new(50, 0))],
//!     ),
//! )?;
//!
//! assert_eq!(ledger.group_members(&group).await?.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::{
    error::{Error, Result},
    storage::{ExpenseStore, GroupDirectory, GroupSnapshot},
    types::{ensure_quantized, Expense, GroupId, Member, MemberId, NewExpense, Split},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug)]
struct GroupRecord {
    name: String,
    members: Vec<Member>,
    expenses: Vec<Expense>,
}

impl GroupRecord {
    fn has_member(&self, member_id: &MemberId) -> bool {
        self.members.iter().any(|m| &m.id == member_id)
    }
}

/// In-memory ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    groups: RwLock<HashMap<GroupId, GroupRecord>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group with an initial member list
    pub fn create_group(&self, name: impl Into<String>, members: Vec<Member>) -> Result<GroupId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidGroup("group name is required".to_string()));
        }
        if members.is_empty() {
            return Err(Error::InvalidGroup(
                "a group needs at least one member".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(&member.id) {
                return Err(Error::AlreadyExists(format!("member {}", member.id)));
            }
        }

        let group_id = GroupId::generate();
        tracing::info!(%group_id, members = members.len(), "Group created");

        self.groups.write().insert(
            group_id,
            GroupRecord {
                name,
                members,
                expenses: Vec::new(),
            },
        );
        Ok(group_id)
    }

    /// Add a member to an existing group
    pub fn add_member(&self, group_id: &GroupId, member: Member) -> Result<()> {
        let mut groups = self.groups.write();
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;

        if group.has_member(&member.id) {
            return Err(Error::AlreadyExists(format!("member {}", member.id)));
        }

        tracing::debug!(%group_id, member = %member.id, "Member added");
        group.members.push(member);
        Ok(())
    }

    /// Group display name
    pub fn group_name(&self, group_id: &GroupId) -> Result<String> {
        self.groups
            .read()
            .get(group_id)
            .map(|g| g.name.clone())
            .ok_or_else(|| Error::group_not_found(group_id))
    }

    /// Validate and record a new expense.
    ///
    /// The payer and every split member must belong to the group, split
    /// amounts must sum exactly to the expense amount, and all amounts must
    /// be non-negative and quantized to the minor unit. New splits are
    /// unpaid.
    pub fn record_expense(&self, group_id: &GroupId, request: NewExpense) -> Result<Expense> {
        let mut groups = self.groups.write();
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;

        if !group.has_member(&request.paid_by) {
            return Err(Error::Forbidden(format!(
                "{} is not a member of group {}",
                request.paid_by, group_id
            )));
        }

        Self::validate_expense(group, &request)?;

        let expense = Expense {
            expense_id: Uuid::now_v7(),
            group_id: *group_id,
            description: request.description,
            amount: request.amount,
            paid_by: request.paid_by,
            created_at: Utc::now(),
            splits: request
                .splits
                .into_iter()
                .map(|s| Split {
                    split_id: Uuid::now_v7(),
                    member: s.member,
                    amount: Some(s.amount),
                    paid: false,
                })
                .collect(),
        };

        tracing::info!(
            %group_id,
            expense_id = %expense.expense_id,
            amount = %expense.amount,
            splits = expense.splits.len(),
            "Expense recorded"
        );

        group.expenses.push(expense.clone());
        Ok(expense)
    }

    fn validate_expense(group: &GroupRecord, request: &NewExpense) -> Result<()> {
        if request.description.trim().is_empty() {
            return Err(Error::InvalidExpense("description is required".to_string()));
        }
        if request.splits.is_empty() {
            return Err(Error::InvalidExpense("splits are required".to_string()));
        }

        ensure_quantized(request.amount)?;

        let total = request.split_total();
        if total != request.amount {
            return Err(Error::InvalidExpense(format!(
                "total splits {} must equal expense amount {}",
                total, request.amount
            )));
        }

        let mut seen = HashSet::new();
        for split in &request.splits {
            ensure_quantized(split.amount)?;
            if !group.has_member(&split.member) {
                return Err(Error::Forbidden(format!(
                    "{} is not a member of this group",
                    split.member
                )));
            }
            if !seen.insert(&split.member) {
                return Err(Error::InvalidExpense(format!(
                    "{} appears in more than one split",
                    split.member
                )));
            }
        }

        Ok(())
    }

    /// Fetch a single expense
    pub fn expense(&self, group_id: &GroupId, expense_id: Uuid) -> Result<Expense> {
        let groups = self.groups.read();
        let group = groups
            .get(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;

        group
            .expenses
            .iter()
            .find(|e| e.expense_id == expense_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("expense {}", expense_id)))
    }

    /// Mark a split as paid.
    ///
    /// Only the member the split is attributed to may mark it. Marking an
    /// already paid split is a no-op.
    pub fn mark_split_paid(
        &self,
        group_id: &GroupId,
        expense_id: Uuid,
        split_id: Uuid,
        member_id: &MemberId,
    ) -> Result<Split> {
        let mut groups = self.groups.write();
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;

        let split = group
            .expenses
            .iter_mut()
            .find(|e| e.expense_id == expense_id)
            .ok_or_else(|| Error::NotFound(format!("expense {}", expense_id)))?
            .splits
            .iter_mut()
            .find(|s| s.split_id == split_id)
            .ok_or_else(|| Error::NotFound(format!("expense split {}", split_id)))?;

        if &split.member != member_id {
            return Err(Error::Forbidden(
                "members can only mark their own splits as paid".to_string(),
            ));
        }

        if !split.paid {
            split.paid = true;
            tracing::info!(%group_id, %expense_id, %split_id, "Split marked as paid");
        }

        Ok(split.clone())
    }
}

#[async_trait]
impl GroupDirectory for MemoryLedger {
    async fn group_members(&self, group_id: &GroupId) -> Result<Vec<Member>> {
        self.groups
            .read()
            .get(group_id)
            .map(|g| g.members.clone())
            .ok_or_else(|| Error::group_not_found(group_id))
    }

    async fn is_member(&self, group_id: &GroupId, member_id: &MemberId) -> Result<bool> {
        let groups = self.groups.read();
        let group = groups
            .get(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;
        Ok(group.has_member(member_id))
    }
}

#[async_trait]
impl ExpenseStore for MemoryLedger {
    async fn group_expenses(&self, group_id: &GroupId) -> Result<Vec<Expense>> {
        // One read guard for the whole snapshot
        let groups = self.groups.read();
        groups
            .get(group_id)
            .map(|g| g.expenses.clone())
            .ok_or_else(|| Error::group_not_found(group_id))
    }

    async fn group_snapshot(&self, group_id: &GroupId) -> Result<Option<GroupSnapshot>> {
        let groups = self.groups.read();
        let group = groups
            .get(group_id)
            .ok_or_else(|| Error::group_not_found(group_id))?;

        Ok(Some(GroupSnapshot {
            members: group.members.clone(),
            expenses: group.expenses.clone(),
        }))
    }
}
