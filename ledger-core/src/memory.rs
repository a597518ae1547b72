//! In-memory transaction store
//!
//! Same contract as the RocksDB store, without durability. Used by tests and
//! by deployments configured with the `memory` backend.

use crate::{
    error::{Error, Result},
    storage::TransactionStore,
    types::{NewTransaction, Transaction, TransactionId},
};
use parking_lot::RwLock;

/// Volatile transaction store; rows are kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryStorage {
    rows: RwLock<Vec<Transaction>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a row deleted. Administrative; the engine never calls this.
    pub fn soft_delete(&self, id: TransactionId) -> Result<()> {
        let mut rows = self.rows.write();
        let row = rows
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::Storage(format!("Transaction {} not found", id)))?;
        row.deleted = true;
        Ok(())
    }

    /// Number of rows, including soft-deleted ones
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store holds no rows at all
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl TransactionStore for MemoryStorage {
    fn append(&self, entry: NewTransaction) -> Result<Transaction> {
        let mut rows = self.rows.write();
        // IDs start at 1 and rows are never removed, so position doubles as ID
        let tx = entry.into_transaction(rows.len() as TransactionId + 1);
        rows.push(tx.clone());
        Ok(tx)
    }

    fn list_ordered_by_timestamp(&self) -> Result<Vec<Transaction>> {
        let mut live = self.list_all()?;
        // Stable sort keeps insertion order for equal timestamps
        live.sort_by_key(|t| t.timestamp);
        Ok(live)
    }

    fn list_all(&self) -> Result<Vec<Transaction>> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|t| !t.deleted)
            .cloned()
            .collect())
    }

    fn save_batch(&self, transactions: &[Transaction]) -> Result<()> {
        let mut rows = self.rows.write();

        // Resolve every position before touching anything
        let mut positions = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let index = tx.id.checked_sub(1).map(|i| i as usize);
            match index.and_then(|i| rows.get(i).map(|row| (i, row))) {
                Some((i, row)) if row.payer == tx.payer && row.timestamp == tx.timestamp => {
                    positions.push(i)
                }
                Some(_) => {
                    return Err(Error::Storage(format!(
                        "Transaction {} identity changed in update",
                        tx.id
                    )))
                }
                None => {
                    return Err(Error::Storage(format!(
                        "Cannot update unknown transaction {}",
                        tx.id
                    )))
                }
            }
        }

        // Only points change; the stored deleted flag wins
        for (i, tx) in positions.into_iter().zip(transactions) {
            rows[i].points = tx.points;
        }

        Ok(())
    }
}
