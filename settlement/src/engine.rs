//! Main settlement engine
//!
//! Orchestrates authorization, balance aggregation and netting for one
//! group. Each call reads one snapshot from the storage ports and keeps all
//! working state local, so concurrent calls never interfere.

use crate::{
    balance::{BalanceAggregator, Balances},
    config::Config,
    metrics::Metrics,
    money::checked_sum,
    netting::NettingEngine,
    types::*,
    Error, Result,
};
use chrono::Utc;
use ledger_core::{ExpenseStore, GroupDirectory, GroupId, Member, MemberId};
use std::collections::HashMap;
use std::sync::Arc;

/// Settlement engine
pub struct SettlementEngine {
    /// Group membership port
    directory: Arc<dyn GroupDirectory>,

    /// Expense snapshot port
    expenses: Arc<dyn ExpenseStore>,

    /// Balance aggregator
    aggregator: BalanceAggregator,

    /// Netting engine
    netting: NettingEngine,

    /// Metrics (absent when disabled)
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(
        config: Config,
        directory: Arc<dyn GroupDirectory>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> Result<Self> {
        config.validate()?;

        let scale = config.netting.minor_unit_scale;
        let metrics = if config.metrics.enabled {
            Some(Metrics::new()?)
        } else {
            None
        };

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            scale,
            "Settlement engine ready"
        );

        Ok(Self {
            directory,
            expenses,
            aggregator: BalanceAggregator::new(scale),
            netting: NettingEngine::new(scale),
            metrics,
            config,
        })
    }

    /// Create an engine backed by a single store implementing both ports
    pub fn with_store<S>(config: Config, store: Arc<S>) -> Result<Self>
    where
        S: GroupDirectory + ExpenseStore + 'static,
    {
        let directory: Arc<dyn GroupDirectory> = store.clone();
        let expenses: Arc<dyn ExpenseStore> = store;
        Self::new(config, directory, expenses)
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Ordered payments that settle every debt in the group.
    ///
    /// Fails with `NotFound` if the group does not exist and `Forbidden` if
    /// `requester` is not one of its members. Never returns a partial list.
    pub async fn calculate_settlements(
        &self,
        group_id: &GroupId,
        requester: &MemberId,
    ) -> Result<Vec<SettlementInstruction>> {
        Ok(self.settlement_plan(group_id, requester).await?.settlements)
    }

    /// Payments plus netting statistics for the group
    pub async fn settlement_plan(
        &self,
        group_id: &GroupId,
        requester: &MemberId,
    ) -> Result<SettlementPlan> {
        if let Some(metrics) = &self.metrics {
            metrics.record_computation();
        }

        let result = self.compute_plan(group_id, requester).await;

        match &result {
            Ok(plan) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(plan.settlements.len());
                }
                tracing::info!(
                    %group_id,
                    payments = plan.summary.payment_count,
                    gross = %plan.summary.gross_amount,
                    net = %plan.summary.net_amount,
                    "Settlement computed"
                );
            }
            Err(err) => self.record_failure(group_id, err),
        }

        result
    }

    /// Net balance of every group member, ordered by member ID
    pub async fn group_balances(
        &self,
        group_id: &GroupId,
        requester: &MemberId,
    ) -> Result<Vec<MemberBalance>> {
        let result = self.compute_balances(group_id, requester).await;

        match &result {
            Ok(balances) => tracing::debug!(
                %group_id,
                members = balances.len(),
                open = balances.iter().filter(|b| !b.balance.is_zero()).count(),
                "Balances computed"
            ),
            Err(err) => self.record_failure(group_id, err),
        }

        result
    }

    async fn compute_balances(
        &self,
        group_id: &GroupId,
        requester: &MemberId,
    ) -> Result<Vec<MemberBalance>> {
        let (members, balances) = self.load_balances(group_id, requester).await?;
        let names = name_index(&members);

        balances
            .iter()
            .map(|(member_id, balance)| {
                Ok(MemberBalance {
                    member_id: member_id.clone(),
                    name: lookup_name(&names, member_id)?,
                    balance,
                })
            })
            .collect()
    }

    fn record_failure(&self, group_id: &GroupId, err: &Error) {
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(err);
        }
        match err {
            Error::InvariantViolation(_) | Error::Overflow(_) => {
                tracing::error!(%group_id, error = %err, "Settlement computation fault")
            }
            _ => tracing::warn!(%group_id, kind = err.kind(), error = %err, "Settlement refused"),
        }
    }

    async fn compute_plan(&self, group_id: &GroupId, requester: &MemberId) -> Result<SettlementPlan> {
        let (members, balances) = self.load_balances(group_id, requester).await?;

        let transfers = self.netting.compute_transfers(&balances)?;
        if self.config.netting.verify_postconditions {
            self.netting.verify(&balances, &transfers)?;
        }

        let names = name_index(&members);
        let settlements = transfers
            .iter()
            .map(|t| {
                Ok(SettlementInstruction {
                    from_member_id: t.debtor.clone(),
                    from_name: lookup_name(&names, &t.debtor)?,
                    to_member_id: t.creditor.clone(),
                    to_name: lookup_name(&names, &t.creditor)?,
                    amount: t.amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = SettlementSummary {
            member_count: balances.len(),
            obligation_count: balances.obligation_count(),
            gross_amount: balances.gross_amount(),
            payment_count: settlements.len(),
            net_amount: checked_sum(settlements.iter().map(|s| s.amount))?,
        };

        Ok(SettlementPlan {
            group_id: *group_id,
            settlements,
            summary,
            computed_at: Utc::now(),
        })
    }

    /// Authorize the requester, then aggregate one expense snapshot
    async fn load_balances(
        &self,
        group_id: &GroupId,
        requester: &MemberId,
    ) -> Result<(Vec<Member>, Balances)> {
        let members = self.directory.group_members(group_id).await?;

        if !self.directory.is_member(group_id, requester).await? {
            return Err(Error::Forbidden(format!(
                "{} is not a member of group {}",
                requester, group_id
            )));
        }

        // Members and expenses from one read when the store supports it
        let (members, expenses) = match self.expenses.group_snapshot(group_id).await? {
            Some(snapshot) => (snapshot.members, snapshot.expenses),
            None => (members, self.expenses.group_expenses(group_id).await?),
        };
        tracing::debug!(
            %group_id,
            members = members.len(),
            expenses = expenses.len(),
            "Snapshot loaded"
        );

        let member_ids: Vec<MemberId> = members.iter().map(|m| m.id.clone()).collect();
        let balances = self.aggregator.aggregate(&member_ids, &expenses)?;

        let total = balances.total()?;
        if !total.is_zero() {
            return Err(Error::InvariantViolation(format!(
                "group {} balances sum to {}",
                group_id, total
            )));
        }

        Ok((members, balances))
    }
}

fn name_index(members: &[Member]) -> HashMap<&MemberId, &str> {
    members.iter().map(|m| (&m.id, m.name.as_str())).collect()
}

fn lookup_name(names: &HashMap<&MemberId, &str>, member_id: &MemberId) -> Result<String> {
    names
        .get(member_id)
        .map(|name| name.to_string())
        .ok_or_else(|| {
            Error::InvariantViolation(format!("{} has a balance but no membership", member_id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{GroupSnapshot, MemoryLedger, NewExpense, NewSplit};
    use rust_decimal_macros::dec;

    fn engine_with(ledger: Arc<MemoryLedger>) -> SettlementEngine {
        SettlementEngine::with_store(Config::default(), ledger).unwrap()
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let engine = engine_with(Arc::new(MemoryLedger::new()));
        assert!(engine.metrics().is_some());
        assert_eq!(engine.config().netting.minor_unit_scale, 2);
    }

    #[tokio::test]
    async fn test_engine_rejects_scale_other_than_ledger() {
        let ledger = Arc::new(MemoryLedger::new());
        let group = ledger
            .create_group("pair", vec![Member::new("a", "Alice"), Member::new("b", "Bob")])
            .unwrap();
        ledger
            .record_expense(
                &group,
                NewExpense::new("tickets", dec!(12.50), "a", vec![NewSplit::new("b", dec!(12.50))]),
            )
            .unwrap();

        for scale in [0, 1, 3, 20] {
            let mut config = Config::default();
            config.netting.minor_unit_scale = scale;

            let result = SettlementEngine::with_store(config, ledger.clone());
            assert!(matches!(result, Err(Error::Config(_))), "scale {}", scale);
        }

        // Cent amounts the ledger accepted settle under the default scale
        let settlements = engine_with(ledger)
            .calculate_settlements(&group, &MemberId::new("a"))
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].amount, dec!(12.50));
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let mut config = Config::default();
        config.metrics.enabled = false;

        let engine = SettlementEngine::with_store(config, Arc::new(MemoryLedger::new())).unwrap();
        assert!(engine.metrics().is_none());
    }

    #[tokio::test]
    async fn test_plan_summary() {
        let ledger = Arc::new(MemoryLedger::new());
        let group = ledger
            .create_group(
                "banks",
                vec![
                    Member::new("a", "Alice"),
                    Member::new("b", "Bob"),
                    Member::new("c", "Carol"),
                ],
            )
            .unwrap();

        // A owes B 100, B owes C 80, C owes A 50
        for (payer, debtor, amount) in [("b", "a", dec!(100)), ("c", "b", dec!(80)), ("a", "c", dec!(50))] {
            ledger
                .record_expense(
                    &group,
                    NewExpense::new("loan", amount, payer, vec![NewSplit::new(debtor, amount)]),
                )
                .unwrap();
        }

        let engine = engine_with(ledger);
        let plan = engine
            .settlement_plan(&group, &MemberId::new("a"))
            .await
            .unwrap();

        // A: -50, B: +20, C: +30 -> A pays C 30, A pays B 20
        assert_eq!(plan.summary.obligation_count, 3);
        assert_eq!(plan.summary.gross_amount, dec!(230));
        assert_eq!(plan.summary.net_amount, dec!(50));
        assert_eq!(plan.summary.amount_saved(), dec!(180));
        assert_eq!(plan.settlements.len(), 2);
        assert_eq!(plan.settlements[0].to_name, "Carol");
        assert_eq!(plan.settlements[0].amount, dec!(30));
        assert_eq!(plan.settlements[1].to_name, "Bob");
        assert_eq!(plan.settlements[1].amount, dec!(20));

        let metrics = engine.metrics().unwrap();
        assert_eq!(metrics.computations_total.get(), 1);
        assert_eq!(metrics.payments_per_computation.get_sample_count(), 1);
    }

    /// Ports backed by fixed data, for snapshots the ledger would refuse
    struct FixedStore {
        members: Vec<Member>,
        expenses: ledger_core::Result<Vec<ledger_core::Expense>>,
        snapshot: Option<GroupSnapshot>,
    }

    #[async_trait::async_trait]
    impl GroupDirectory for FixedStore {
        async fn group_members(&self, _: &GroupId) -> ledger_core::Result<Vec<Member>> {
            Ok(self.members.clone())
        }

        async fn is_member(&self, _: &GroupId, member_id: &MemberId) -> ledger_core::Result<bool> {
            Ok(self.members.iter().any(|m| &m.id == member_id))
        }
    }

    #[async_trait::async_trait]
    impl ExpenseStore for FixedStore {
        async fn group_expenses(&self, _: &GroupId) -> ledger_core::Result<Vec<ledger_core::Expense>> {
            self.expenses.clone()
        }

        async fn group_snapshot(&self, _: &GroupId) -> ledger_core::Result<Option<GroupSnapshot>> {
            Ok(self.snapshot.clone())
        }
    }

    fn outsider_expense(group_id: GroupId) -> ledger_core::Expense {
        ledger_core::Expense {
            expense_id: uuid::Uuid::now_v7(),
            group_id,
            description: "left the group".to_string(),
            amount: dec!(10),
            paid_by: MemberId::new("a"),
            created_at: Utc::now(),
            splits: vec![ledger_core::Split {
                split_id: uuid::Uuid::now_v7(),
                member: MemberId::new("gone"),
                amount: Some(dec!(10)),
                paid: false,
            }],
        }
    }

    #[tokio::test]
    async fn test_outsider_split_is_forbidden() {
        let group = GroupId::generate();
        let store = Arc::new(FixedStore {
            members: vec![Member::new("a", "Alice")],
            expenses: Ok(vec![outsider_expense(group)]),
            snapshot: None,
        });
        let engine = SettlementEngine::with_store(Config::default(), store).unwrap();

        let result = engine.calculate_settlements(&group, &MemberId::new("a")).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let store = Arc::new(FixedStore {
            members: vec![Member::new("a", "Alice")],
            expenses: Err(ledger_core::Error::Storage("disk on fire".to_string())),
            snapshot: None,
        });
        let engine = SettlementEngine::with_store(Config::default(), store).unwrap();

        let result = engine
            .calculate_settlements(&GroupId::generate(), &MemberId::new("a"))
            .await;
        assert!(matches!(result, Err(Error::Ledger(_))));
    }

    #[tokio::test]
    async fn test_snapshot_members_cover_snapshot_expenses() {
        // Directory read predates "gone" joining; the snapshot includes both
        let group = GroupId::generate();
        let store = Arc::new(FixedStore {
            members: vec![Member::new("a", "Alice")],
            expenses: Ok(vec![]),
            snapshot: Some(GroupSnapshot {
                members: vec![Member::new("a", "Alice"), Member::new("gone", "Gwen")],
                expenses: vec![outsider_expense(group)],
            }),
        });
        let engine = SettlementEngine::with_store(Config::default(), store).unwrap();

        let settlements = engine
            .calculate_settlements(&group, &MemberId::new("a"))
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].from_name, "Gwen");
        assert_eq!(settlements[0].to_name, "Alice");
        assert_eq!(settlements[0].amount, dec!(10));
    }

    #[tokio::test]
    async fn test_balance_failures_are_counted() {
        let ledger = Arc::new(MemoryLedger::new());
        let group = ledger
            .create_group("pair", vec![Member::new("a", "Alice")])
            .unwrap();
        let engine = engine_with(ledger);

        let result = engine.group_balances(&group, &MemberId::new("z")).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        let missing = engine
            .group_balances(&GroupId::generate(), &MemberId::new("a"))
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let metrics = engine.metrics().unwrap();
        assert_eq!(metrics.computations_total.get(), 0);
        assert_eq!(
            metrics.failures_total.with_label_values(&["forbidden"]).get(),
            1
        );
        assert_eq!(
            metrics.failures_total.with_label_values(&["not_found"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let ledger = Arc::new(MemoryLedger::new());
        let group = ledger
            .create_group("pair", vec![Member::new("a", "Alice")])
            .unwrap();
        let engine = engine_with(ledger);

        let result = engine.settlement_plan(&group, &MemberId::new("z")).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));

        let metrics = engine.metrics().unwrap();
        assert_eq!(
            metrics.failures_total.with_label_values(&["forbidden"]).get(),
            1
        );
    }
}
