//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the [`Engine`] and runs every operation to completion
//! - A spend's read-compute-write cycle can never interleave with another
//!   spend or a credit
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              HTTP handlers (many tasks)               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │     credit / spend / balance, one at a time          │
//! │                       │                               │
//! │                       ▼                               │
//! │              TransactionStore                         │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::engine::Engine;
use crate::types::{Balances, CreditRequest, PayerDelta, Transaction};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Append a credit
    Credit {
        /// Unvalidated credit
        request: CreditRequest,
        /// Reply channel
        response: oneshot::Sender<Result<Transaction>>,
    },

    /// Spend points
    Spend {
        /// Points to deduct
        amount: i64,
        /// Reply channel
        response: oneshot::Sender<Result<Vec<PayerDelta>>>,
    },

    /// Read per-payer totals
    Balance {
        /// Reply channel
        response: oneshot::Sender<Result<Balances>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Engine, owned exclusively by this task
    engine: Engine,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(engine: Engine, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { engine, mailbox }
    }

    /// Run the actor event loop until shutdown or every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Credit { request, response } => {
                    let _ = response.send(self.engine.credit(request));
                }

                LedgerMessage::Spend { amount, response } => {
                    let _ = response.send(self.engine.spend(amount));
                }

                LedgerMessage::Balance { response } => {
                    let _ = response.send(self.engine.balance());
                }

                LedgerMessage::Shutdown => {
                    tracing::info!("Ledger actor shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Append a credit
    pub async fn credit(&self, request: CreditRequest) -> Result<Transaction> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Credit {
            request,
            response: tx,
        })
        .await?;
        Self::receive(rx).await
    }

    /// Spend points
    pub async fn spend(&self, amount: i64) -> Result<Vec<PayerDelta>> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Spend {
            amount,
            response: tx,
        })
        .await?;
        Self::receive(rx).await
    }

    /// Read per-payer totals
    pub async fn balance(&self) -> Result<Balances> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Balance { response: tx }).await?;
        Self::receive(rx).await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(LedgerMessage::Shutdown).await
    }

    async fn send(&self, msg: LedgerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    async fn receive<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(engine: Engine, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(engine, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
