//! Storage layer: the transaction store contract and its RocksDB implementation
//!
//! # Column Families
//!
//! - `transactions` - Ledger entries (key: id, big-endian)
//! - `by_timestamp` - Consumption-order index (key: timestamp || id)
//! - `meta` - Counters (`next_id`)

use crate::{
    error::{Error, Result},
    types::{NewTransaction, Transaction, TransactionId},
    Config,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::fmt;
use std::path::PathBuf;

/// Column family names
const CF_TRANSACTIONS: &str = "transactions";
const CF_BY_TIMESTAMP: &str = "by_timestamp";
const CF_META: &str = "meta";

const META_NEXT_ID: &[u8] = b"next_id";

/// Durable, ordered collection of ledger entries.
///
/// Every read excludes soft-deleted rows. Implementations must make
/// [`save_batch`](TransactionStore::save_batch) all-or-nothing.
pub trait TransactionStore: Send + Sync {
    /// Append a new entry and return it with its assigned ID
    fn append(&self, entry: NewTransaction) -> Result<Transaction>;

    /// All entries by timestamp ascending, ties broken by insertion order
    fn list_ordered_by_timestamp(&self) -> Result<Vec<Transaction>>;

    /// All entries, any order
    fn list_all(&self) -> Result<Vec<Transaction>>;

    /// Update the points of existing rows by ID. Unknown IDs fail the whole
    /// batch; identity and the soft-delete flag are never overwritten.
    fn save_batch(&self, transactions: &[Transaction]) -> Result<()>;
}

/// RocksDB-backed transaction store
pub struct RocksStorage {
    db: DB,
    path: PathBuf,
    /// Next ID to assign; held across the append write so IDs commit in order
    next_id: Mutex<TransactionId>,
}

impl RocksStorage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.storage.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.storage.max_background_jobs);

        if config.storage.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_BY_TIMESTAMP, Self::cf_options_index()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let next_id = {
            let cf = db
                .cf_handle(CF_META)
                .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_META)))?;
            match db.get_cf(cf, META_NEXT_ID)? {
                Some(bytes) => decode_id(&bytes)?,
                None => 1,
            }
        };

        tracing::info!(path = ?path, next_id, "Opened RocksDB transaction store");

        Ok(Self {
            db,
            path: path.clone(),
            next_id: Mutex::new(next_id),
        })
    }

    // Column family options

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_index() -> Options {
        let mut opts = Options::default();
        // Index keys are scanned in order, never looked up
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Mark a row deleted. Administrative; the engine never calls this.
    pub fn soft_delete(&self, id: TransactionId) -> Result<()> {
        let mut tx = self
            .get(id)?
            .ok_or_else(|| Error::Storage(format!("Transaction {} not found", id)))?;
        tx.deleted = true;

        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        self.db.put_cf(cf, id.to_be_bytes(), bincode::serialize(&tx)?)?;

        tracing::info!(id, payer = %tx.payer, "Transaction soft-deleted");
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let mut stats = StorageStats::default();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let tx: Transaction = bincode::deserialize(&value)?;
            stats.total_transactions += 1;
            if tx.deleted {
                stats.deleted_transactions += 1;
            }
        }

        Ok(stats)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl TransactionStore for RocksStorage {
    fn append(&self, entry: NewTransaction) -> Result<Transaction> {
        let mut next_id = self.next_id.lock();
        let tx = entry.into_transaction(*next_id);

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf_handle(CF_TRANSACTIONS)?,
            tx.id.to_be_bytes(),
            bincode::serialize(&tx)?,
        );
        batch.put_cf(
            self.cf_handle(CF_BY_TIMESTAMP)?,
            index_key(&tx.timestamp, tx.id),
            b"",
        );
        batch.put_cf(
            self.cf_handle(CF_META)?,
            META_NEXT_ID,
            (tx.id + 1).to_be_bytes(),
        );

        // Atomic commit
        self.db.write(batch)?;
        *next_id += 1;

        tracing::debug!(id = tx.id, payer = %tx.payer, points = tx.points, "Transaction appended");
        Ok(tx)
    }

    fn list_ordered_by_timestamp(&self) -> Result<Vec<Transaction>> {
        let cf_index = self.cf_handle(CF_BY_TIMESTAMP)?;

        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf_index, IteratorMode::Start) {
            let (key, _) = item?;
            let id = decode_id(&key[key.len().saturating_sub(8)..])?;
            let tx = self.get(id)?.ok_or_else(|| {
                Error::Storage(format!("Index points at missing transaction {}", id))
            })?;
            if !tx.deleted {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn list_all(&self) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let tx: Transaction = bincode::deserialize(&value)?;
            if !tx.deleted {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn save_batch(&self, transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut batch = WriteBatch::default();

        for tx in transactions {
            let mut stored = self.get(tx.id)?.ok_or_else(|| {
                Error::Storage(format!("Cannot update unknown transaction {}", tx.id))
            })?;
            if stored.payer != tx.payer || stored.timestamp != tx.timestamp {
                return Err(Error::Storage(format!(
                    "Transaction {} identity changed in update",
                    tx.id
                )));
            }
            // Only points change; the stored deleted flag wins
            stored.points = tx.points;
            batch.put_cf(cf, tx.id.to_be_bytes(), bincode::serialize(&stored)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(rows = transactions.len(), "Transaction batch saved");
        Ok(())
    }
}

impl fmt::Debug for RocksStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStorage")
            .field("path", &self.path)
            .field("next_id", &*self.next_id.lock())
            .finish()
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Rows ever appended
    pub total_transactions: u64,
    /// Rows hidden by soft delete
    pub deleted_transactions: u64,
}

/// Order-preserving key: sign-flipped seconds, subsecond nanos, then ID
fn index_key(timestamp: &DateTime<Utc>, id: TransactionId) -> Vec<u8> {
    let secs = (timestamp.timestamp() as u64) ^ (1 << 63);
    let mut key = Vec::with_capacity(20);
    key.extend_from_slice(&secs.to_be_bytes());
    key.extend_from_slice(&timestamp.timestamp_subsec_nanos().to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn decode_id(bytes: &[u8]) -> Result<TransactionId> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Storage(format!("Malformed id of {} bytes", bytes.len())))?;
    Ok(TransactionId::from_be_bytes(raw))
}
