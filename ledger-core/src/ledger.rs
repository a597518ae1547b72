//! Main ledger orchestration layer
//!
//! This module ties together storage, the engine and the actor into the
//! async API a boundary adapter calls.
//!
//! # Example
//!
//! ```no_run
//! use points_ledger::{Config, CreditRequest, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> points_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     ledger
//!         .credit(CreditRequest::new("DANNON", 300, chrono::Utc::now()))
//!         .await?;
//!     let spent = ledger.spend(100).await?;
//!     let balance = ledger.balance().await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    allocation::AllocationPolicy,
    config::StorageBackend,
    engine::Engine,
    memory::MemoryStorage,
    metrics::Metrics,
    storage::{RocksStorage, TransactionStore},
    types::{Balances, CreditRequest, PayerDelta, Transaction},
    Config, Error, Result,
};
use std::sync::Arc;
use std::time::Instant;

/// Main ledger interface
#[derive(Clone, Debug)]
pub struct Ledger {
    /// Actor handle; every operation goes through the single writer
    handle: LedgerHandle,

    /// Per-instance metrics
    metrics: Metrics,

    /// Allocation policy the engine was built with
    policy: AllocationPolicy,
}

impl Ledger {
    /// Open ledger with configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn TransactionStore> = match config.storage.backend {
            StorageBackend::Rocksdb => Arc::new(RocksStorage::open(&config)?),
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory store; ledger contents will not survive restart");
                Arc::new(MemoryStorage::new())
            }
        };

        Self::with_store(
            store,
            config.allocation.policy,
            config.actor.mailbox_capacity,
        )
    }

    /// Build a ledger over an existing store
    pub fn with_store(
        store: Arc<dyn TransactionStore>,
        policy: AllocationPolicy,
        mailbox_capacity: usize,
    ) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        let handle = spawn_ledger_actor(Engine::new(store, policy), mailbox_capacity.max(1));

        tracing::info!(policy = ?policy, "Ledger started");

        Ok(Self {
            handle,
            metrics,
            policy,
        })
    }

    /// Append a credit or negative adjustment
    pub async fn credit(&self, request: CreditRequest) -> Result<Transaction> {
        let result = self.handle.credit(request).await;
        match &result {
            Ok(_) => self.metrics.record_credit(),
            Err(e) => self.record_failure(e),
        }
        result
    }

    /// Spend points, oldest first across all payers
    pub async fn spend(&self, amount: i64) -> Result<Vec<PayerDelta>> {
        let start = Instant::now();
        let result = self.handle.spend(amount).await;
        match &result {
            Ok(_) => self
                .metrics
                .record_spend(amount, start.elapsed().as_secs_f64()),
            Err(Error::InsufficientBalance { .. }) => self.metrics.record_spend_rejected(),
            Err(e) => self.record_failure(e),
        }
        result
    }

    /// Current per-payer totals
    pub async fn balance(&self) -> Result<Balances> {
        let result = self.handle.balance().await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    /// Metrics for this ledger
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Allocation policy in effect
    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Shutdown ledger
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    fn record_failure(&self, error: &Error) {
        if error.is_storage_error() {
            self.metrics.record_storage_error();
            tracing::error!(error = %error, "Ledger storage failure");
        }
    }
}
