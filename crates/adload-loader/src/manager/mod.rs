//! Ad load manager.
//!
//! Owns one load attempt: the bid, the connection, the ad configuration and
//! the creative factory. It forwards the attempt's single terminal result to
//! a weakly-held delegate.
//!
//! # Concurrency Model
//!
//! - One atomic terminal claim decides between the factory's result,
//!   `request_completed_failure`, the load timer and manager teardown
//! - The delegate is only ever called on the dispatch task
//! - Failure revokes the transaction; success leaves it valid so the
//!   creatives' download-hooks keep working

mod dispatch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use adload_core::{
    AdConfiguration, AdLoadError, AdLoadManagerDelegate, Bid, CreativeModel,
    ServerConnectionPort, Transaction, TransactionId,
};

use crate::factory::{CreativeFactory, FactoryConfig, FactoryHandle};

use dispatch::{Delivery, LoadState, run_dispatch};

/// Manages one ad load attempt.
pub struct AdLoadManager {
    bid: Bid,
    connection: Arc<dyn ServerConnectionPort>,
    ad_configuration: AdConfiguration,
    state: Arc<LoadState>,
    /// Taken when the dispatch task is spawned.
    dispatch: Mutex<Option<mpsc::UnboundedReceiver<Delivery>>>,
    /// Set by the first `make_creatives`.
    started: AtomicBool,
    factory: Mutex<Option<FactoryHandle>>,
}

impl AdLoadManager {
    /// Create a manager for `bid`.
    ///
    /// Nothing is spawned until the attempt starts, so this may be called
    /// outside a tokio runtime.
    pub fn new(
        bid: Bid,
        connection: Arc<dyn ServerConnectionPort>,
        ad_configuration: AdConfiguration,
    ) -> Self {
        let (state, deliveries) = LoadState::new();
        Self {
            bid,
            connection,
            ad_configuration,
            state,
            dispatch: Mutex::new(Some(deliveries)),
            started: AtomicBool::new(false),
            factory: Mutex::new(None),
        }
    }

    /// The bid being loaded.
    pub const fn bid(&self) -> &Bid {
        &self.bid
    }

    /// The ad configuration.
    pub const fn ad_configuration(&self) -> &AdConfiguration {
        &self.ad_configuration
    }

    /// Whether the attempt has reached its terminal result.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the factory is still running.
    ///
    /// Can outlast `is_finished()`: after a failure the build tasks wind
    /// down on their own and their results are discarded.
    pub fn is_building(&self) -> bool {
        self.factory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|factory| !factory.is_finished())
    }

    /// Transaction of the attempt, once `make_creatives` has run.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.state.transaction_id()
    }

    /// Register the delegate. Only a weak reference is kept.
    pub fn set_delegate<D>(&self, delegate: &Arc<D>)
    where
        D: AdLoadManagerDelegate + 'static,
    {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn AdLoadManagerDelegate> = weak;
        self.state.set_delegate(Some(weak));
    }

    /// Unregister the delegate. A pending result is then dropped.
    pub fn clear_delegate(&self) {
        self.state.set_delegate(None);
    }

    /// Build creatives for `creative_models`.
    ///
    /// The delegate receives `creatives_ready` with one creative per model,
    /// in order, or `load_failed`. Only the first call starts an attempt;
    /// later calls are ignored.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn make_creatives(&self, creative_models: Vec<CreativeModel>) {
        if self.state.is_terminal() {
            tracing::warn!(
                target: "adload.manager",
                bid = %self.bid.id,
                "make_creatives called after the load finished, ignoring"
            );
            return;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                target: "adload.manager",
                bid = %self.bid.id,
                "make_creatives called twice, ignoring"
            );
            return;
        }

        self.ensure_dispatcher();

        let transaction = Transaction::new(creative_models);
        let handle = transaction.handle();
        tracing::info!(
            target: "adload.manager",
            bid = %self.bid.id,
            transaction = %handle.id(),
            models = handle.creative_models().len(),
            "Loading creatives"
        );
        self.state.install(transaction);

        if let Some(timeout) = self.ad_configuration.load_timeout() {
            self.arm_timer(timeout);
        }

        let state = Arc::clone(&self.state);
        let factory = CreativeFactory::new(Arc::clone(&self.connection), handle, move |result| {
            state.complete(result);
        })
        .with_config(FactoryConfig::from(&self.ad_configuration));

        let factory = factory.start();
        *self.factory.lock().unwrap_or_else(PoisonError::into_inner) = Some(factory);
    }

    /// Fail the attempt now with `error`.
    ///
    /// Revokes the transaction so in-flight downloads are discarded. No-op
    /// once the attempt has a terminal result.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime while the attempt is open.
    pub fn request_completed_failure(&self, error: AdLoadError) {
        if self.state.fail(error) {
            self.ensure_dispatcher();
        }
    }

    /// Spawn the dispatch task on first use.
    fn ensure_dispatcher(&self) {
        let deliveries = self
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(deliveries) = deliveries {
            tokio::spawn(run_dispatch(Arc::clone(&self.state), deliveries));
        }
    }

    fn arm_timer(&self, timeout: std::time::Duration) {
        let state = Arc::clone(&self.state);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = state.done().cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    state.fail(AdLoadError::timeout(timeout_ms));
                }
            }
        });
    }
}

impl Drop for AdLoadManager {
    fn drop(&mut self) {
        if self.state.claim() {
            tracing::debug!(
                target: "adload.manager",
                bid = %self.bid.id,
                "Manager dropped before the load finished"
            );
            self.state.revoke();
        }
        self.state.done().cancel();
    }
}

impl std::fmt::Debug for AdLoadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdLoadManager")
            .field("bid", &self.bid.id)
            .field("transaction", &self.transaction_id())
            .field("finished", &self.is_finished())
            .field("building", &self.is_building())
            .finish_non_exhaustive()
    }
}
