//! Multilateral netting
//!
//! Reduces net balances to an ordered list of payments with a greedy
//! two-cursor match.
//!
//! # Algorithm
//!
//! 1. Split members into creditors (balance > 0) and debtors (balance < 0)
//! 2. Sort creditors by balance descending, debtors by balance ascending
//!    (largest debt first); equal balances are ordered by member ID
//! 3. Pay `min(|debtor|, creditor)`, rounded half-up to the minor unit
//! 4. Advance the debtor cursor when its balance hits zero, the creditor
//!    cursor when its balance hits zero (both may move in one step)
//!
//! # Example
//!
//! ```text
//! Net positions:
//!   A: +60
//!   B: -30
//!   C: -30
//!
//! Payments:
//!   B pays A: 30
//!   C pays A: 30
//! ```
//!
//! Each step zeroes at least one member, so the loop runs at most
//! `n - 1` times for `n` members with an open position.

use crate::{balance::Balances, money::round_to_minor, types::Transfer, Error, Result};
use ledger_core::MemberId;
use rust_decimal::Decimal;

/// Netting engine
#[derive(Debug, Clone)]
pub struct NettingEngine {
    /// Minor unit scale used for rounding payments
    scale: u32,
}

impl NettingEngine {
    /// Create new netting engine
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    /// Compute the payments that settle `balances`.
    ///
    /// Fails with `InvariantViolation` if the balances do not sum to zero or
    /// if the reduction leaves a residual balance.
    pub fn compute_transfers(&self, balances: &Balances) -> Result<Vec<Transfer>> {
        let total = balances.total()?;
        if !total.is_zero() {
            return Err(Error::InvariantViolation(format!(
                "balances sum to {} instead of zero",
                total
            )));
        }

        let mut creditors: Vec<(MemberId, Decimal)> = balances
            .iter()
            .filter(|(_, b)| *b > Decimal::ZERO)
            .map(|(m, b)| (m.clone(), b))
            .collect();

        let mut debtors: Vec<(MemberId, Decimal)> = balances
            .iter()
            .filter(|(_, b)| *b < Decimal::ZERO)
            .map(|(m, b)| (m.clone(), b))
            .collect();

        creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        debtors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());
        let mut i = 0;
        let mut j = 0;

        while i < debtors.len() && j < creditors.len() {
            let owed = debtors[i].1.abs();
            let have = creditors[j].1;
            let pay = round_to_minor(owed.min(have), self.scale);

            if pay > Decimal::ZERO {
                transfers.push(Transfer {
                    debtor: debtors[i].0.clone(),
                    creditor: creditors[j].0.clone(),
                    amount: pay,
                });

                debtors[i].1 += pay;
                creditors[j].1 -= pay;
            }

            let debtor_done = debtors[i].1.is_zero();
            let creditor_done = creditors[j].1.is_zero();

            if !debtor_done && !creditor_done {
                // Only reachable when rounding moved `pay` off min(owed, have)
                return Err(Error::InvariantViolation(format!(
                    "netting stalled between {} ({}) and {} ({})",
                    debtors[i].0, debtors[i].1, creditors[j].0, creditors[j].1
                )));
            }

            if debtor_done {
                i += 1;
            }
            if creditor_done {
                j += 1;
            }
        }

        let residual = debtors[i..]
            .iter()
            .chain(creditors[j..].iter())
            .find(|(_, b)| !b.is_zero());

        if let Some((member, amount)) = residual {
            return Err(Error::InvariantViolation(format!(
                "residual balance {} left on {} after netting",
                amount, member
            )));
        }

        tracing::debug!(
            creditors = creditors.len(),
            debtors = debtors.len(),
            payments = transfers.len(),
            "Netting complete"
        );

        Ok(transfers)
    }

    /// Check that `transfers` settle `initial` exactly.
    ///
    /// Every amount must be positive, no member may pay itself, and applying
    /// all transfers must drive every balance to zero.
    pub fn verify(&self, initial: &Balances, transfers: &[Transfer]) -> Result<()> {
        let mut working = initial.clone();

        for transfer in transfers {
            if transfer.amount <= Decimal::ZERO {
                return Err(Error::InvariantViolation(format!(
                    "non-positive payment {} from {} to {}",
                    transfer.amount, transfer.debtor, transfer.creditor
                )));
            }
            if transfer.debtor == transfer.creditor {
                return Err(Error::InvariantViolation(format!(
                    "self-payment by {}",
                    transfer.debtor
                )));
            }
            working.apply(transfer).map_err(|e| match e {
                Error::Forbidden(msg) => Error::InvariantViolation(msg),
                other => other,
            })?;
        }

        if let Some((member, amount)) = working.iter().find(|(_, b)| !b.is_zero()) {
            return Err(Error::InvariantViolation(format!(
                "payments leave {} with balance {}",
                member, amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn id(name: &str) -> MemberId {
        MemberId::new(name)
    }

    fn balances(entries: &[(&str, Decimal)]) -> Balances {
        entries.iter().map(|(m, b)| (id(m), *b)).collect()
    }

    fn transfer(debtor: &str, creditor: &str, amount: Decimal) -> Transfer {
        Transfer {
            debtor: id(debtor),
            creditor: id(creditor),
            amount,
        }
    }

    #[test]
    fn test_simple_netting() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", dec!(50)), ("b", dec!(-50))]);

        let transfers = engine.compute_transfers(&input).unwrap();

        assert_eq!(transfers, vec![transfer("b", "a", dec!(50.00))]);
        engine.verify(&input, &transfers).unwrap();
    }

    #[test]
    fn test_one_creditor_many_debtors() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", dec!(60)), ("b", dec!(-30)), ("c", dec!(-30))]);

        let transfers = engine.compute_transfers(&input).unwrap();

        assert_eq!(
            transfers,
            vec![transfer("b", "a", dec!(30)), transfer("c", "a", dec!(30))]
        );
    }

    #[test]
    fn test_largest_positions_matched_first() {
        let engine = NettingEngine::new(2);
        // Creditors: d 70, e 30. Debtors: a -50, b -40, c -10
        let input = balances(&[
            ("a", dec!(-50)),
            ("b", dec!(-40)),
            ("c", dec!(-10)),
            ("d", dec!(70)),
            ("e", dec!(30)),
        ]);

        let transfers = engine.compute_transfers(&input).unwrap();

        assert_eq!(
            transfers,
            vec![
                transfer("a", "d", dec!(50)),
                transfer("b", "d", dec!(20)),
                transfer("b", "e", dec!(20)),
                transfer("c", "e", dec!(10)),
            ]
        );
        engine.verify(&input, &transfers).unwrap();
    }

    #[test]
    fn test_both_cursors_advance_on_exact_match() {
        let engine = NettingEngine::new(2);
        let input = balances(&[
            ("a", dec!(25)),
            ("b", dec!(10)),
            ("c", dec!(-25)),
            ("d", dec!(-10)),
        ]);

        let transfers = engine.compute_transfers(&input).unwrap();

        assert_eq!(
            transfers,
            vec![transfer("c", "a", dec!(25)), transfer("d", "b", dec!(10))]
        );
    }

    #[test]
    fn test_ties_broken_by_member_id() {
        let engine = NettingEngine::new(2);
        let input = balances(&[
            ("z", dec!(-10)),
            ("m", dec!(-10)),
            ("y", dec!(10)),
            ("b", dec!(10)),
        ]);

        let transfers = engine.compute_transfers(&input).unwrap();

        assert_eq!(
            transfers,
            vec![transfer("m", "b", dec!(10)), transfer("z", "y", dec!(10))]
        );
    }

    #[test]
    fn test_zero_balances_need_no_payment() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", Decimal::ZERO), ("b", Decimal::ZERO)]);
        assert!(engine.compute_transfers(&input).unwrap().is_empty());
        assert!(engine.compute_transfers(&Balances::default()).unwrap().is_empty());
    }

    #[test]
    fn test_unbalanced_input_is_an_invariant_violation() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", dec!(50)), ("b", dec!(-40))]);

        let result = engine.compute_transfers(&input);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_sub_unit_balances_stall_instead_of_looping() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", dec!(0.005)), ("b", dec!(-0.005))]);

        let result = engine.compute_transfers(&input);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_rejects_bad_payments() {
        let engine = NettingEngine::new(2);
        let input = balances(&[("a", dec!(50)), ("b", dec!(-50))]);

        assert!(engine
            .verify(&input, &[transfer("b", "a", dec!(40))])
            .is_err());
        assert!(engine
            .verify(&input, &[transfer("a", "a", dec!(50))])
            .is_err());
        assert!(engine
            .verify(&input, &[transfer("b", "a", dec!(60)), transfer("a", "b", dec!(-10))])
            .is_err());
        assert!(matches!(
            engine.verify(&input, &[transfer("b", "z", dec!(50))]),
            Err(Error::InvariantViolation(_))
        ));
    }
}
