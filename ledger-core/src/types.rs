//! Core types for the points ledger
//!
//! All persisted types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (integer points, no floats)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Transaction identifier, assigned by the store on append.
///
/// Strictly increasing and never reused, so it also records insertion order.
pub type TransactionId = u64;

/// Per-payer point totals, ordered by payer for deterministic output
pub type Balances = BTreeMap<PayerId, i64>;

/// Identifier of the party that issued points
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayerId(String);

impl PayerId {
    /// Create new payer ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One ledger entry.
///
/// Identity is fixed at creation; only `points` changes afterwards, and only
/// through a spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned ID
    pub id: TransactionId,

    /// Issuing party
    pub payer: PayerId,

    /// Signed remaining quantity (positive = credit, negative = adjustment)
    pub points: i64,

    /// Logical time of the credit; determines consumption order
    pub timestamp: DateTime<Utc>,

    /// Soft-delete marker, managed by the store only
    #[serde(default)]
    pub deleted: bool,
}

/// A validated credit, ready to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Issuing party
    pub payer: PayerId,
    /// Non-zero signed quantity
    pub points: i64,
    /// Logical time of the credit
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    /// Attach a store-assigned ID
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            payer: self.payer,
            points: self.points,
            timestamp: self.timestamp,
            deleted: false,
        }
    }
}

/// Unvalidated credit input as received at the boundary.
///
/// Every field is optional so that a missing field surfaces as a
/// validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditRequest {
    /// Issuing party
    pub payer: Option<String>,
    /// Signed point quantity
    pub points: Option<i64>,
    /// Logical time of the credit
    pub timestamp: Option<DateTime<Utc>>,
}

impl CreditRequest {
    /// Build a fully populated request
    pub fn new(payer: impl Into<String>, points: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            payer: Some(payer.into()),
            points: Some(points),
            timestamp: Some(timestamp),
        }
    }

    /// Check required fields.
    ///
    /// Negative points are accepted unconditionally; only zero is refused.
    pub fn validate(self) -> crate::Result<NewTransaction> {
        let payer = match self.payer {
            Some(payer) if !payer.is_empty() => PayerId::new(payer),
            _ => return Err(crate::Error::Validation("payer is required".to_string())),
        };

        let points = match self.points {
            Some(points) if points != 0 => points,
            _ => {
                return Err(crate::Error::Validation(
                    "points is required and must be non-zero".to_string(),
                ))
            }
        };

        let timestamp = self
            .timestamp
            .ok_or_else(|| crate::Error::Validation("timestamp is required".to_string()))?;

        Ok(NewTransaction {
            payer,
            points,
            timestamp,
        })
    }
}

/// Unvalidated spend input as received at the boundary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendRequest {
    /// Points to deduct from the overall balance
    pub points: Option<i64>,
}

impl SpendRequest {
    /// Build a populated request
    pub fn new(points: i64) -> Self {
        Self {
            points: Some(points),
        }
    }

    /// Check that the amount is present and positive
    pub fn validate(self) -> crate::Result<i64> {
        match self.points {
            Some(points) if points > 0 => Ok(points),
            Some(points) => Err(crate::Error::Validation(format!(
                "points must be positive, got {}",
                points
            ))),
            None => Err(crate::Error::Validation("points is required".to_string())),
        }
    }
}

/// Per-payer outcome of a spend (negative points denote a debit)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayerDelta {
    /// Payer whose points were consumed
    pub payer: PayerId,
    /// Signed change, `-consumed`
    pub points: i64,
}

/// Sum points by payer, skipping soft-deleted rows.
///
/// Fails with [`crate::Error::Overflow`] if any payer's total leaves `i64`.
pub fn aggregate_balances<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> crate::Result<Balances> {
    let mut balances = Balances::new();
    for tx in transactions.into_iter().filter(|t| !t.deleted) {
        let total = balances.entry(tx.payer.clone()).or_insert(0);
        *total = total.checked_add(tx.points).ok_or_else(|| {
            crate::Error::Overflow(format!("balance of {} exceeds the points range", tx.payer))
        })?;
    }
    Ok(balances)
}

/// Ledger-wide total of live rows.
///
/// Fails with [`crate::Error::Overflow`] if the running sum leaves `i64`.
pub fn total_points<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> crate::Result<i64> {
    transactions
        .into_iter()
        .filter(|t| !t.deleted)
        .try_fold(0i64, |total, tx| {
            total
                .checked_add(tx.points)
                .ok_or_else(|| crate::Error::Overflow("ledger total exceeds the points range".into()))
        })
}
