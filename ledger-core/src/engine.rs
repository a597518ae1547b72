//! Ledger engine: credit, spend and balance over the store contract
//!
//! The engine is synchronous and holds no locks of its own. Callers that
//! share it across tasks must serialize access; [`crate::Ledger`] does so by
//! running it inside a single actor.

use crate::{
    allocation::{allocate, AllocationPolicy},
    storage::TransactionStore,
    types::{aggregate_balances, total_points, Balances, CreditRequest, PayerDelta, Transaction},
    Error, Result,
};
use std::fmt;
use std::sync::Arc;

/// Points ledger engine
pub struct Engine {
    store: Arc<dyn TransactionStore>,
    policy: AllocationPolicy,
}

impl Engine {
    /// Create engine over a store
    pub fn new(store: Arc<dyn TransactionStore>, policy: AllocationPolicy) -> Self {
        Self { store, policy }
    }

    /// Allocation policy in effect
    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Append one credit (or negative adjustment).
    ///
    /// No balance check is made; a negative credit may drive its payer's
    /// total below zero. A credit that would push its payer's total or the
    /// ledger-wide total out of `i64` is refused with [`Error::Overflow`].
    pub fn credit(&self, request: CreditRequest) -> Result<Transaction> {
        let entry = request.validate()?;

        let existing = self.store.list_all()?;
        let payer_total = aggregate_balances(&existing)?
            .get(&entry.payer)
            .copied()
            .unwrap_or(0);
        let fits = payer_total.checked_add(entry.points).is_some()
            && total_points(&existing)?.checked_add(entry.points).is_some();
        if !fits {
            tracing::warn!(
                payer = %entry.payer,
                points = entry.points,
                "Credit rejected: total out of range"
            );
            return Err(Error::Overflow(format!(
                "crediting {} points to {} exceeds the points range",
                entry.points, entry.payer
            )));
        }

        let tx = self.store.append(entry)?;

        tracing::info!(
            id = tx.id,
            payer = %tx.payer,
            points = tx.points,
            timestamp = %tx.timestamp,
            "Points credited"
        );

        Ok(tx)
    }

    /// Deduct `amount` points, oldest entries first across all payers.
    ///
    /// Fails with [`Error::InsufficientBalance`] and mutates nothing when the
    /// global total is short. Every changed entry is persisted in one batch.
    pub fn spend(&self, amount: i64) -> Result<Vec<PayerDelta>> {
        if amount <= 0 {
            return Err(Error::Validation(format!(
                "points must be positive, got {}",
                amount
            )));
        }

        let mut ordered = self.store.list_ordered_by_timestamp()?;

        let available = total_points(&ordered)?;
        if available < amount {
            tracing::warn!(requested = amount, available, "Spend rejected: not enough points");
            return Err(Error::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let allocation = allocate(&mut ordered, amount, self.policy)?;
        if allocation.remaining > 0 {
            // Unreachable while the total check above holds; refuse rather than persist
            return Err(Error::InsufficientBalance {
                requested: amount,
                available: amount - allocation.remaining,
            });
        }

        if allocation.consumed_non_positive {
            tracing::warn!(
                requested = amount,
                "Spend consumed a non-positive entry; reported debits may not sum to the request"
            );
        }

        let changed: Vec<Transaction> = allocation
            .touched
            .iter()
            .map(|&i| ordered[i].clone())
            .collect();
        self.store.save_batch(&changed)?;

        let deltas = allocation.deltas()?;

        tracing::info!(
            requested = amount,
            rows_updated = changed.len(),
            payers = deltas.len(),
            "Points spent"
        );

        Ok(deltas)
    }

    /// Current per-payer totals. Payers without entries are absent.
    pub fn balance(&self) -> Result<Balances> {
        let transactions = self.store.list_all()?;
        let balances = aggregate_balances(&transactions)?;

        tracing::debug!(payers = balances.len(), rows = transactions.len(), "Balance computed");
        Ok(balances)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("policy", &self.policy).finish()
    }
}
