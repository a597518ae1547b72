//! Oldest-first spend allocation
//!
//! Decides which historical credits a spend consumes.
//!
//! # Algorithm
//!
//! 1. Walk entries in consumption order (timestamp, then insertion)
//! 2. Consume each entry whole while it fits in what remains
//! 3. Consume the first entry that does not fit partially, then stop
//! 4. Tally consumption per payer
//!
//! # Example
//!
//! ```text
//! Ledger (oldest first):
//!   DANNON        +300
//!   UNILEVER      +200
//!   DANNON        -200
//!   MILLER COORS  +10000
//!   DANNON        +1000
//!
//! Spend 5000:
//!   DANNON    300 -> 0     remaining 4700
//!   UNILEVER  200 -> 0     remaining 4500
//!   DANNON   -200 -> 0     remaining 4700
//!   MILLER  10000 -> 5300  remaining 0
//!
//! Result: DANNON -100, UNILEVER -200, MILLER COORS -4700
//! ```
//!
//! Under [`AllocationPolicy::Faithful`] an entry with zero or negative
//! points always satisfies `points <= remaining`, so it is "consumed":
//! its value is added to the payer's tally, `remaining` grows by its
//! magnitude and the entry is zeroed. The payer's reported debit shrinks
//! accordingly and the absolute deltas no longer sum to the request.
//! [`AllocationPolicy::SkipNonPositive`] leaves such entries untouched.

use crate::types::{PayerDelta, PayerId, Transaction};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the walk treats entries whose points are zero or negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Consume non-positive entries like any other (historical behavior)
    #[default]
    Faithful,
    /// Walk past non-positive entries without touching them
    SkipNonPositive,
}

impl AllocationPolicy {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "faithful" => Some(AllocationPolicy::Faithful),
            "skip_non_positive" | "skip-non-positive" => Some(AllocationPolicy::SkipNonPositive),
            _ => None,
        }
    }
}

/// Outcome of one allocation walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Points consumed per payer; scoped to one spend
    pub consumed: HashMap<PayerId, i64>,

    /// Indices (into the walked slice) of entries whose points changed
    pub touched: Vec<usize>,

    /// Whether a non-positive entry was consumed during the walk
    pub consumed_non_positive: bool,

    /// Points still owed when the walk ended (zero when the total covered it)
    pub remaining: i64,
}

impl Allocation {
    /// `(payer, -consumed)` for every payer with non-zero consumption
    pub fn deltas(&self) -> Result<Vec<PayerDelta>> {
        self.consumed
            .iter()
            .filter(|(_, consumed)| **consumed != 0)
            .map(|(payer, consumed)| {
                let points = consumed.checked_neg().ok_or_else(|| {
                    Error::Overflow(format!("debit for {} exceeds the points range", payer))
                })?;
                Ok(PayerDelta {
                    payer: payer.clone(),
                    points,
                })
            })
            .collect()
    }
}

/// Consume `amount` points from `ordered`, oldest first, mutating in place.
///
/// `ordered` must already be in consumption order. The caller is
/// responsible for the global-total check; this function only walks.
/// Fails with [`Error::Overflow`] if a tally or the amount still owed
/// leaves `i64`; `ordered` may then be partly rewritten and must be dropped.
pub fn allocate(
    ordered: &mut [Transaction],
    amount: i64,
    policy: AllocationPolicy,
) -> Result<Allocation> {
    let mut allocation = Allocation {
        remaining: amount,
        ..Allocation::default()
    };

    for (index, tx) in ordered.iter_mut().enumerate() {
        if allocation.remaining <= 0 {
            break;
        }

        if tx.points <= 0 && policy == AllocationPolicy::SkipNonPositive {
            continue;
        }

        // Whole entry while it fits, otherwise only what is still owed
        let taken = tx.points.min(allocation.remaining);

        let tally = allocation.consumed.entry(tx.payer.clone()).or_insert(0);
        *tally = tally.checked_add(taken).ok_or_else(|| {
            Error::Overflow(format!("consumption for {} exceeds the points range", tx.payer))
        })?;
        allocation.remaining = allocation.remaining.checked_sub(taken).ok_or_else(|| {
            Error::Overflow("points still owed exceed the points range".to_string())
        })?;

        if tx.points <= 0 {
            allocation.consumed_non_positive = true;
        }
        if taken != 0 {
            tx.points -= taken;
            allocation.touched.push(index);
        }
    }

    Ok(allocation)
}
