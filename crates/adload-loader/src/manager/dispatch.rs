//! Terminal-state bookkeeping and delegate dispatch.
//!
//! `LoadState` is shared between the manager, the factory's finished
//! callback, the load timer and the dispatch task. Every event that can end
//! a load attempt goes through `claim()`; only the winner sends a
//! `Delivery`, and the dispatch task forwards it to the delegate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use adload_core::{
    AbstractCreative, AdLoadError, AdLoadManagerDelegate, Transaction, TransactionId,
};

use crate::factory::FactoryResult;

/// Terminal result of a load attempt, on its way to the delegate.
#[derive(Debug)]
pub(super) enum Delivery {
    Ready(Vec<AbstractCreative>),
    Failed(AdLoadError),
}

/// State shared by everything that can end a load attempt.
pub(super) struct LoadState {
    /// Set once by whoever ends the attempt.
    terminal: AtomicBool,
    /// The attempt's transaction, once `make_creatives` has run.
    transaction: Mutex<Option<Transaction>>,
    delegate: RwLock<Option<Weak<dyn AdLoadManagerDelegate>>>,
    deliveries: mpsc::UnboundedSender<Delivery>,
    /// Cancelled when the attempt ends or the manager is dropped.
    done: CancellationToken,
}

impl LoadState {
    pub(super) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery>) {
        let (deliveries, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Self {
            terminal: AtomicBool::new(false),
            transaction: Mutex::new(None),
            delegate: RwLock::new(None),
            deliveries,
            done: CancellationToken::new(),
        });
        (state, rx)
    }

    /// Try to become the event that ends the attempt.
    pub(super) fn claim(&self) -> bool {
        self.terminal
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(super) fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::Acquire)
    }

    pub(super) fn done(&self) -> &CancellationToken {
        &self.done
    }

    /// Install the attempt's transaction.
    ///
    /// A transaction installed after the attempt already ended is revoked
    /// on the spot so nothing runs under it.
    pub(super) fn install(&self, transaction: Transaction) {
        let mut slot = self.transaction.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_terminal() {
            transaction.invalidate();
        }
        *slot = Some(transaction);
    }

    pub(super) fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Transaction::id)
    }

    /// Revoke the transaction, if any. In-flight downloads get discarded.
    pub(super) fn revoke(&self) {
        if let Some(transaction) = self
            .transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            transaction.invalidate();
        }
    }

    pub(super) fn set_delegate(&self, delegate: Option<Weak<dyn AdLoadManagerDelegate>>) {
        *self.delegate.write().unwrap_or_else(PoisonError::into_inner) = delegate;
    }

    fn delegate(&self) -> Option<Arc<dyn AdLoadManagerDelegate>> {
        self.delegate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Finished callback of the factory.
    pub(super) fn complete(&self, result: FactoryResult) {
        match result {
            Ok(creatives) => {
                if !self.claim() {
                    tracing::debug!(
                        target: "adload.manager",
                        creatives = creatives.len(),
                        "Discarding creatives for a finished load"
                    );
                    return;
                }
                tracing::info!(
                    target: "adload.manager",
                    transaction = ?self.transaction_id(),
                    creatives = creatives.len(),
                    "Creatives ready"
                );
                self.deliver(Delivery::Ready(creatives));
            }
            Err(error) => {
                self.fail(error);
            }
        }
    }

    /// End the attempt with `error`, unless it already ended.
    ///
    /// Returns whether this call ended the attempt.
    pub(super) fn fail(&self, error: AdLoadError) -> bool {
        if !self.claim() {
            tracing::debug!(
                target: "adload.manager",
                error = %error,
                "Ignoring failure for a finished load"
            );
            return false;
        }
        self.revoke();
        tracing::warn!(
            target: "adload.manager",
            transaction = ?self.transaction_id(),
            error = %error,
            "Ad load failed"
        );
        self.deliver(Delivery::Failed(error));
        true
    }

    fn deliver(&self, delivery: Delivery) {
        // Receiver only goes away together with the manager
        let _ = self.deliveries.send(delivery);
        self.done.cancel();
    }
}

/// Forward the attempt's delivery to the delegate.
///
/// Runs on its own task so the delegate is never called on the stack of the
/// caller or of the factory. Exits after one delivery, or when the manager
/// is dropped without one.
pub(super) async fn run_dispatch(
    state: Arc<LoadState>,
    mut deliveries: mpsc::UnboundedReceiver<Delivery>,
) {
    let delivery = tokio::select! {
        biased;

        delivery = deliveries.recv() => delivery,
        () = state.done().cancelled() => deliveries.try_recv().ok(),
    };
    let Some(delivery) = delivery else {
        return;
    };

    let Some(delegate) = state.delegate() else {
        tracing::debug!(
            target: "adload.manager",
            "Delegate is gone, dropping load result"
        );
        return;
    };

    match delivery {
        Delivery::Ready(creatives) => delegate.creatives_ready(creatives),
        Delivery::Failed(error) => delegate.load_failed(error),
    }
}
