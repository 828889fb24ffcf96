//! Storage ports
//!
//! Read-side contracts the settlement core depends on. Membership and
//! expense persistence live behind these traits; the core never reaches
//! past them.
//!
//! # Ports
//!
//! - [`GroupDirectory`] - group membership lookups
//! - [`ExpenseStore`] - expense snapshots with their splits
//!
//! A store that can read members and expenses together should override
//! [`ExpenseStore::group_snapshot`]. Without it the two reads are separate,
//! and a member added between them (together with an expense naming that
//! member) makes the expense reference someone outside the member list.

use crate::{
    error::Result,
    types::{Expense, GroupId, Member, MemberId},
};
use async_trait::async_trait;

/// Group membership lookups
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Members of a group, with display names.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if the group
    /// does not exist.
    async fn group_members(&self, group_id: &GroupId) -> Result<Vec<Member>>;

    /// Whether `member_id` belongs to the group
    async fn is_member(&self, group_id: &GroupId, member_id: &MemberId) -> Result<bool>;
}

/// Members and expenses of a group read at the same instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Members, with display names
    pub members: Vec<Member>,

    /// Expenses with their splits
    pub expenses: Vec<Expense>,
}

/// Expense snapshots
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// All expenses of a group, each carrying its full split list.
    ///
    /// Implementations must return a single consistent read: an expense is
    /// never returned without all of its splits.
    async fn group_expenses(&self, group_id: &GroupId) -> Result<Vec<Expense>>;

    /// Members and expenses from one consistent read, if the store can
    /// provide it. The default returns `None` and callers fall back to
    /// separate reads.
    async fn group_snapshot(&self, _group_id: &GroupId) -> Result<Option<GroupSnapshot>> {
        Ok(None)
    }
}
