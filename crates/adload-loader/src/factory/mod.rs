//! Creative factory.
//!
//! Constructs one `AbstractCreative` per model of a load transaction and
//! reports the whole set, or the first failure, exactly once.
//!
//! # Architecture
//!
//! - **Build tasks**: one per model, running the model's eager downloads
//!   (see `builder`). They never touch aggregation state.
//! - **Aggregator**: a single task owning the `CreativeAccumulator`. Build
//!   tasks send `ModelOutcome`s to it over an mpsc channel, so there is no
//!   lock around the results.
//!
//! # Cancellation
//!
//! The aggregator stops as soon as the transaction is revoked and reports
//! `Cancelled`. Build tasks keep running until their fetches finish; the
//! fetched bytes are discarded.

mod accumulator;
mod builder;

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use adload_core::domain::DEFAULT_MAX_CONCURRENT_DOWNLOADS;
use adload_core::{
    AbstractCreative, AdConfiguration, AdLoadError, ServerConnectionPort, TransactionHandle,
    TransactionId,
};

pub use accumulator::CreativeAccumulator;
use builder::{BuildDeps, BuildJob, build_creative};

/// Outcome of a factory run: every creative in model order, or the failure.
pub type FactoryResult = Result<Vec<AbstractCreative>, AdLoadError>;

/// Callback receiving the factory's single result.
pub type FinishedCallback = Box<dyn FnOnce(FactoryResult) + Send + 'static>;

/// Factory tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Maximum number of asset fetches in flight at once.
    pub max_concurrent_downloads: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS as usize,
        }
    }
}

impl FactoryConfig {
    /// Set the download concurrency limit (minimum 1).
    #[must_use]
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }
}

impl From<&AdConfiguration> for FactoryConfig {
    fn from(config: &AdConfiguration) -> Self {
        Self::default()
            .with_max_concurrent_downloads(config.effective_max_concurrent_downloads() as usize)
    }
}

/// Settled result of one model, sent from a build task to the aggregator.
struct ModelOutcome {
    index: usize,
    result: Result<AbstractCreative, AdLoadError>,
}

/// Builds the creatives of one load transaction.
pub struct CreativeFactory {
    connection: Arc<dyn ServerConnectionPort>,
    transaction: TransactionHandle,
    config: FactoryConfig,
    finished: FinishedCallback,
}

impl CreativeFactory {
    /// Create a factory for the models carried by `transaction`.
    ///
    /// `finished` is called exactly once with the outcome, unless the
    /// runtime shuts down before the factory completes.
    pub fn new<F>(
        connection: Arc<dyn ServerConnectionPort>,
        transaction: TransactionHandle,
        finished: F,
    ) -> Self
    where
        F: FnOnce(FactoryResult) + Send + 'static,
    {
        Self {
            connection,
            transaction,
            config: FactoryConfig::default(),
            finished: Box::new(finished),
        }
    }

    /// Override the factory tuning.
    #[must_use]
    pub fn with_config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Transaction this factory builds under.
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction.id()
    }

    /// Start building.
    ///
    /// An empty model set fails with `EmptyCreativeSet` and a revoked
    /// transaction with `Cancelled`; both are reported before `start`
    /// returns and without any network access. Otherwise one build task
    /// per model and the aggregator are spawned on the current tokio
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if there are models to build and no tokio runtime is running.
    pub fn start(self) -> FactoryHandle {
        let Self {
            connection,
            transaction,
            config,
            finished,
        } = self;
        let transaction_id = transaction.id();
        let model_count = transaction.creative_models().len();

        if model_count == 0 {
            tracing::warn!(
                target: "adload.factory",
                transaction = %transaction_id,
                "No creative models to build"
            );
            finished(Err(AdLoadError::EmptyCreativeSet));
            return FactoryHandle::settled(transaction_id);
        }
        if !transaction.is_valid() {
            tracing::debug!(
                target: "adload.factory",
                transaction = %transaction_id,
                "Transaction revoked before start"
            );
            finished(Err(AdLoadError::Cancelled));
            return FactoryHandle::settled(transaction_id);
        }

        tracing::debug!(
            target: "adload.factory",
            transaction = %transaction_id,
            models = model_count,
            max_concurrent_downloads = config.max_concurrent_downloads,
            "Starting creative factory"
        );

        let deps = BuildDeps {
            connection,
            transaction: transaction.clone(),
            downloads: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
        };
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        for (index, model) in transaction.creative_models().iter().enumerate() {
            let job = BuildJob {
                index,
                model: Arc::clone(model),
            };
            let deps = deps.clone();
            let outcome_tx = outcome_tx.clone();
            tokio::spawn(async move {
                let result = build_creative(job, &deps).await;
                // Aggregator is gone once the transaction was revoked
                let _ = outcome_tx.send(ModelOutcome { index, result });
            });
        }
        drop(outcome_tx);

        let aggregator = tokio::spawn(aggregate(transaction, outcome_rx, finished));

        FactoryHandle {
            transaction_id,
            aggregator: Some(aggregator),
        }
    }
}

/// Collect outcomes until every model settles or the transaction is revoked.
async fn aggregate(
    transaction: TransactionHandle,
    mut outcomes: mpsc::UnboundedReceiver<ModelOutcome>,
    finished: FinishedCallback,
) {
    let transaction_id = transaction.id();
    let mut accumulator = CreativeAccumulator::new(transaction.creative_models().len());

    let result = loop {
        tokio::select! {
            biased;

            () = transaction.invalidated() => {
                tracing::debug!(
                    target: "adload.factory",
                    transaction = %transaction_id,
                    pending = accumulator.pending(),
                    "Transaction revoked, abandoning build"
                );
                break Err(AdLoadError::Cancelled);
            }

            outcome = outcomes.recv() => {
                let Some(ModelOutcome { index, result }) = outcome else {
                    break Err(AdLoadError::other("creative build task ended without a result"));
                };
                if let Err(error) = &result {
                    tracing::debug!(
                        target: "adload.factory",
                        transaction = %transaction_id,
                        model_index = index,
                        error = %error,
                        "Creative build failed"
                    );
                }
                accumulator.record(index, result);
                if accumulator.is_settled() {
                    break accumulator.finalize();
                }
            }
        }
    };

    // A set that settled concurrently with revocation is stale.
    let result = if transaction.is_valid() {
        result
    } else {
        Err(AdLoadError::Cancelled)
    };

    match &result {
        Ok(creatives) => tracing::debug!(
            target: "adload.factory",
            transaction = %transaction_id,
            creatives = creatives.len(),
            "Creative factory finished"
        ),
        Err(error) => tracing::debug!(
            target: "adload.factory",
            transaction = %transaction_id,
            error = %error,
            "Creative factory failed"
        ),
    }

    finished(result);
}

/// Handle to a started factory.
///
/// Dropping the handle detaches the factory; it still reports its result.
#[derive(Debug)]
pub struct FactoryHandle {
    transaction_id: TransactionId,
    aggregator: Option<JoinHandle<()>>,
}

impl FactoryHandle {
    const fn settled(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            aggregator: None,
        }
    }

    /// Transaction the factory builds under.
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Whether the finished callback has run (or the factory was torn down).
    pub fn is_finished(&self) -> bool {
        self.aggregator.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until the finished callback has run.
    pub async fn join(self) {
        if let Some(aggregator) = self.aggregator {
            if let Err(e) = aggregator.await {
                tracing::warn!(
                    target: "adload.factory",
                    transaction = %self.transaction_id,
                    error = %e,
                    "Creative factory task did not complete"
                );
            }
        }
    }
}
