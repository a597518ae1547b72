//! Points Ledger Core
//!
//! Loyalty-points ledger for a single account with points issued by many payers.
//!
//! # Architecture
//!
//! - **Transaction Store**: Durable, ordered collection of ledger entries behind
//!   the [`TransactionStore`] contract (RocksDB or in-memory)
//! - **Allocation**: Oldest-first greedy consumption across all payers
//! - **Engine**: Credit, spend and balance over the store contract
//! - **Single Writer**: One actor task serializes every operation
//!
//! # Invariants
//!
//! - FIFO by timestamp across the whole ledger, ties broken by insertion order
//! - Spend never mutates anything when the global total is short
//! - A spend's mutations are persisted in one atomic batch

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod memory;
pub mod allocation;
pub mod engine;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;
pub mod ledger;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Balances, CreditRequest, NewTransaction, PayerDelta, PayerId, SpendRequest, Transaction,
    TransactionId,
};
pub use storage::{RocksStorage, TransactionStore};
pub use memory::MemoryStorage;
pub use allocation::AllocationPolicy;
pub use engine::Engine;
pub use ledger::Ledger;
pub use config::Config;
pub use metrics::Metrics;
