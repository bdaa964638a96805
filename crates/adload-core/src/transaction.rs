//! Load transactions.
//!
//! A transaction is the right to perform downloads for one load attempt. It
//! carries the attempt's creative models and a revocation flag. The manager
//! owns the only `Transaction` and is the only party that can invalidate it;
//! the factory, its build tasks and the download-hooks hold
//! `TransactionHandle`s and check validity before issuing a fetch and again
//! before using its result.
//!
//! Revocation never aborts I/O that is already running: fetches finish and
//! their results are dropped by whoever observes the revoked handle.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::CreativeModel;

/// Identifier of a load transaction (for logs and creative bookkeeping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Mint a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The owning side of a load transaction.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    creative_models: Arc<[Arc<CreativeModel>]>,
    token: CancellationToken,
}

impl Transaction {
    /// Open a transaction over an ordered sequence of creative models.
    #[must_use]
    pub fn new(creative_models: Vec<CreativeModel>) -> Self {
        Self {
            id: TransactionId::new(),
            creative_models: creative_models.into_iter().map(Arc::new).collect(),
            token: CancellationToken::new(),
        }
    }

    /// Transaction identifier.
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// The attempt's creative models, in bid order.
    pub fn creative_models(&self) -> &[Arc<CreativeModel>] {
        &self.creative_models
    }

    /// A read-only handle for download tasks.
    #[must_use]
    pub fn handle(&self) -> TransactionHandle {
        TransactionHandle {
            id: self.id,
            creative_models: Arc::clone(&self.creative_models),
            token: self.token.clone(),
        }
    }

    /// Revoke the transaction. Idempotent.
    pub fn invalidate(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(target: "adload.transaction", transaction = %self.id, "Transaction invalidated");
            self.token.cancel();
        }
    }

    /// Whether downloads may still be performed and used.
    pub fn is_valid(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Read-only view of a transaction.
///
/// Handles can observe revocation but never cause it.
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    id: TransactionId,
    creative_models: Arc<[Arc<CreativeModel>]>,
    token: CancellationToken,
}

impl TransactionHandle {
    /// Transaction identifier.
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// The attempt's creative models, in bid order.
    pub fn creative_models(&self) -> &[Arc<CreativeModel>] {
        &self.creative_models
    }

    /// Whether downloads may still be performed and used.
    pub fn is_valid(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once the transaction has been revoked.
    pub async fn invalidated(&self) {
        self.token.cancelled().await;
    }
}
