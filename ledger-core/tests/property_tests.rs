//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Credits alone: balance per payer == sum credited to that payer
//! - Over-spend is refused and leaves the balance unchanged
//! - FIFO across the whole ledger, not per payer
//! - Balance reads are idempotent
//! - Reported debits sum to the request when every entry is positive
//! - The global total always drops by exactly the requested amount

use chrono::{DateTime, TimeZone, Utc};
use points_ledger::{
    AllocationPolicy, Balances, CreditRequest, Engine, Error, Ledger, MemoryStorage, PayerId,
    TransactionStore,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const PAYERS: [&str; 4] = ["DANNON", "UNILEVER", "MILLER COORS", "KRAFT"];

/// Strategy for generating payer names
fn payer_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PAYERS.to_vec())
}

/// Strategy for positive credits: (payer, points, seconds offset)
fn positive_credit_strategy() -> impl Strategy<Value = (&'static str, i64, i64)> {
    (payer_strategy(), 1i64..5_000, 0i64..10_000)
}

/// Strategy for credits that may be negative adjustments
fn signed_credit_strategy() -> impl Strategy<Value = (&'static str, i64, i64)> {
    (
        payer_strategy(),
        prop_oneof![1i64..5_000, -1_000i64..0],
        0i64..10_000,
    )
}

fn ts(offset: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + offset, 0).unwrap()
}

fn engine(store: Arc<MemoryStorage>) -> Engine {
    Engine::new(store, AllocationPolicy::Faithful)
}

fn seed(engine: &Engine, credits: &[(&'static str, i64, i64)]) {
    for (payer, points, offset) in credits {
        engine
            .credit(CreditRequest::new(*payer, *points, ts(*offset)))
            .unwrap();
    }
}

fn total(balances: &Balances) -> i64 {
    balances.values().sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: With no spends, balance equals the per-payer sum of credits
    #[test]
    fn prop_balance_equals_sum_of_credits(
        credits in prop::collection::vec(signed_credit_strategy(), 1..40)
    ) {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &credits);

        let mut expected: HashMap<&str, i64> = HashMap::new();
        for (payer, points, _) in &credits {
            *expected.entry(*payer).or_insert(0) += *points;
        }

        let balance = engine.balance().unwrap();
        prop_assert_eq!(balance.len(), expected.len());
        for (payer, points) in expected {
            prop_assert_eq!(balance.get(&PayerId::new(payer)), Some(&points));
        }
    }

    /// Property: Spending more than the global total fails without mutation
    #[test]
    fn prop_overspend_rejected(
        credits in prop::collection::vec(signed_credit_strategy(), 1..30),
        excess in 1i64..1_000,
    ) {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &credits);

        let before = engine.balance().unwrap();
        let amount = (total(&before) + excess).max(1);
        let result = engine.spend(amount);

        let is_insufficient = matches!(result, Err(Error::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(engine.balance().unwrap(), before);
    }

    /// Property: Oldest entries are exhausted before newer ones, whatever the payer
    #[test]
    fn prop_fifo_across_payers(
        credits in prop::collection::vec(positive_credit_strategy(), 1..30),
        fraction in 1u32..=100,
    ) {
        let store = Arc::new(MemoryStorage::new());
        let engine = engine(store.clone());
        seed(&engine, &credits);

        let available = total(&engine.balance().unwrap());
        let amount = (available * fraction as i64 / 100).max(1);
        engine.spend(amount).unwrap();

        // Exhausted prefix, at most one partial entry, untouched suffix
        let ordered = store.list_ordered_by_timestamp().unwrap();
        let original: HashMap<u64, i64> = ordered
            .iter()
            .map(|t| (t.id, credits[(t.id - 1) as usize].1))
            .collect();

        let first_live = ordered.iter().position(|t| t.points != 0).unwrap_or(ordered.len());
        if let Some(partial) = ordered.get(first_live) {
            prop_assert!(partial.points <= original[&partial.id]);
        }
        for tx in ordered.iter().skip(first_live + 1) {
            prop_assert_eq!(tx.points, original[&tx.id]);
        }
    }

    /// Property: Two balance reads with nothing in between agree
    #[test]
    fn prop_balance_idempotent(
        credits in prop::collection::vec(signed_credit_strategy(), 0..30)
    ) {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &credits);

        let first = engine.balance().unwrap();
        let second = engine.balance().unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: With only positive entries, |deltas| sum to the request
    #[test]
    fn prop_deltas_sum_to_amount_for_positive_ledgers(
        credits in prop::collection::vec(positive_credit_strategy(), 1..30),
        fraction in 1u32..=100,
    ) {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &credits);

        let available = total(&engine.balance().unwrap());
        let amount = (available * fraction as i64 / 100).max(1);
        let deltas = engine.spend(amount).unwrap();

        let absolute: i64 = deltas.iter().map(|d| d.points.abs()).sum();
        prop_assert_eq!(absolute, amount);
        prop_assert!(deltas.iter().all(|d| d.points < 0));
    }

    /// Property: The global total drops by exactly the request, negatives included
    #[test]
    fn prop_global_total_drops_by_amount(
        credits in prop::collection::vec(signed_credit_strategy(), 1..30),
        fraction in 1u32..=100,
    ) {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &credits);

        let before = total(&engine.balance().unwrap());
        prop_assume!(before > 0);
        let amount = (before * fraction as i64 / 100).max(1);

        let deltas = engine.spend(amount).unwrap();
        let signed: i64 = deltas.iter().map(|d| d.points).sum();

        prop_assert_eq!(signed, -amount);
        prop_assert_eq!(total(&engine.balance().unwrap()), before - amount);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Touching a negative adjustment breaks the |deltas| == amount equality
    #[test]
    fn test_negative_adjustment_breaks_absolute_sum() {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(&engine, &[("A", 100, 0), ("B", -50, 1), ("C", 100, 2)]);

        let deltas = engine.spend(120).unwrap();
        let absolute: i64 = deltas.iter().map(|d| d.points.abs()).sum();
        let signed: i64 = deltas.iter().map(|d| d.points).sum();

        assert_eq!(absolute, 220);
        assert_eq!(signed, -120);

        let balance = engine.balance().unwrap();
        assert_eq!(balance.get(&PayerId::new("B")), Some(&0));
        assert_eq!(balance.get(&PayerId::new("C")), Some(&30));
    }

    #[test]
    fn test_reference_scenario_fails_cleanly_on_overspend() {
        let engine = engine(Arc::new(MemoryStorage::new()));
        seed(
            &engine,
            &[
                ("DANNON", 300, 0),
                ("UNILEVER", 200, 1),
                ("DANNON", -200, 2),
                ("MILLER COORS", 10_000, 3),
                ("DANNON", 1_000, 4),
            ],
        );

        engine.spend(5_000).unwrap();
        let err = engine.spend(6_301).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance {
                requested: 6_301,
                available: 6_300
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_credits_and_spends_stay_consistent() {
        let store = Arc::new(MemoryStorage::new());
        let ledger = Ledger::with_store(store, AllocationPolicy::Faithful, 64).unwrap();

        let mut tasks = Vec::new();
        for i in 0..20i64 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger
                    .credit(CreditRequest::new(PAYERS[(i % 4) as usize], 100, ts(i)))
                    .await
                    .unwrap();
                ledger.spend(60).await
            }));
        }

        let mut spent = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                spent += 60;
            }
        }

        let balance = ledger.balance().await.unwrap();
        assert_eq!(total(&balance), 2_000 - spent);
        assert!(total(&balance) >= 0);

        ledger.shutdown().await.unwrap();
    }
}
