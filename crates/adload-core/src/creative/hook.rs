//! Deferred download-hook.
//!
//! A hook is installed on a creative by the factory and invoked later by the
//! renderer when it actually needs an asset, so the network cost is paid at
//! render time. The factory never calls it.
//!
//! # Contract
//!
//! - Each URL is fetched at most once per render attempt; a repeated request
//!   fails with `AdLoadError::DuplicateDownload`. `reset()` starts a new
//!   attempt.
//! - A hook bound to a transaction performs no fetch once the transaction is
//!   revoked, and drops the result of a fetch that finishes after revocation.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::{AdLoadError, AdLoadResult};
use crate::ports::ServerConnectionPort;
use crate::transaction::TransactionHandle;

type FetchFn = dyn Fn(String) -> BoxFuture<'static, AdLoadResult<Bytes>> + Send + Sync;

/// Fetch strategy attached to a lazily-loaded creative.
#[derive(Clone)]
pub struct DownloadHook {
    fetch: Arc<FetchFn>,
    requested: Arc<Mutex<HashSet<String>>>,
}

impl DownloadHook {
    /// Wrap a custom fetch strategy.
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AdLoadResult<Bytes>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move |url| fetch(url).boxed()),
            requested: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// A hook that fetches through `connection` for as long as `transaction`
    /// stays valid.
    pub fn bound(connection: Arc<dyn ServerConnectionPort>, transaction: TransactionHandle) -> Self {
        Self::new(move |url: String| {
            let connection = Arc::clone(&connection);
            let transaction = transaction.clone();
            async move {
                if !transaction.is_valid() {
                    return Err(AdLoadError::Cancelled);
                }

                let result = connection.fetch(&url).await;

                if !transaction.is_valid() {
                    tracing::debug!(
                        target: "adload.hook",
                        transaction = %transaction.id(),
                        url = %url,
                        "Discarding deferred download for revoked transaction"
                    );
                    return Err(AdLoadError::Cancelled);
                }

                result.map_err(|e| AdLoadError::connection(&url, None, &e))
            }
        })
    }

    /// Fetch `url`, once per render attempt.
    pub async fn fetch(&self, url: &str) -> AdLoadResult<Bytes> {
        let first_request = self
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());
        if !first_request {
            return Err(AdLoadError::duplicate_download(url));
        }

        (self.fetch)(url.to_string()).await
    }

    /// Callback form used by renderers.
    ///
    /// Spawns the fetch on the current tokio runtime and calls `on_complete`
    /// with the outcome. A cancelled outcome is discarded: `on_complete` is
    /// not called for a revoked transaction.
    pub fn download<F>(&self, url: impl Into<String>, on_complete: F)
    where
        F: FnOnce(AdLoadResult<Bytes>) + Send + 'static,
    {
        let hook = self.clone();
        let url = url.into();
        tokio::spawn(async move {
            match hook.fetch(&url).await {
                Err(AdLoadError::Cancelled) => {}
                outcome => on_complete(outcome),
            }
        });
    }

    /// Begin a new render attempt: every URL may be fetched again.
    pub fn reset(&self) {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for DownloadHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requested = self
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("DownloadHook")
            .field("requested", &requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreativeModel;
    use crate::ports::ConnectionError;
    use crate::transaction::Transaction;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, oneshot};

    struct CountingConnection {
        calls: AtomicUsize,
        release: Option<Arc<Notify>>,
    }

    impl CountingConnection {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                release: None,
            }
        }

        fn gated(release: Arc<Notify>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                release: Some(release),
            }
        }
    }

    #[async_trait]
    impl ServerConnectionPort for CountingConnection {
        async fn fetch(&self, url: &str) -> Result<Bytes, ConnectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if url.contains("missing") {
                return Err(ConnectionError::with_status("not found", 404));
            }
            Ok(Bytes::from(url.to_string()))
        }
    }

    fn open_transaction() -> Transaction {
        Transaction::new(vec![CreativeModel::html("<p>ad</p>")])
    }

    #[tokio::test]
    async fn test_bound_hook_fetches_through_connection() {
        let connection = Arc::new(CountingConnection::new());
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection.clone(), transaction.handle());

        let data = hook.fetch("https://cdn.example/a.js").await.unwrap();
        assert_eq!(data, Bytes::from("https://cdn.example/a.js"));
        assert_eq!(connection.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_url_is_fetched_once_per_attempt() {
        let connection = Arc::new(CountingConnection::new());
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection.clone(), transaction.handle());

        hook.fetch("https://cdn.example/a.js").await.unwrap();
        let second = hook.clone().fetch("https://cdn.example/a.js").await;
        assert_eq!(
            second,
            Err(AdLoadError::duplicate_download("https://cdn.example/a.js"))
        );
        assert_eq!(connection.calls.load(Ordering::SeqCst), 1);

        hook.reset();
        hook.fetch("https://cdn.example/a.js").await.unwrap();
        assert_eq!(connection.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_revoked_transaction_skips_network() {
        let connection = Arc::new(CountingConnection::new());
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection.clone(), transaction.handle());

        transaction.invalidate();
        let result = hook.fetch("https://cdn.example/a.js").await;

        assert_eq!(result, Err(AdLoadError::Cancelled));
        assert_eq!(connection.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_arriving_after_revocation_is_dropped() {
        let release = Arc::new(Notify::new());
        let connection = Arc::new(CountingConnection::gated(release.clone()));
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection.clone(), transaction.handle());

        let pending = tokio::spawn({
            let hook = hook.clone();
            async move { hook.fetch("https://cdn.example/a.js").await }
        });
        while connection.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        transaction.invalidate();
        release.notify_one();

        assert_eq!(pending.await.unwrap(), Err(AdLoadError::Cancelled));
    }

    #[tokio::test]
    async fn test_download_reports_connection_errors() {
        let connection = Arc::new(CountingConnection::new());
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection, transaction.handle());

        let (tx, rx) = oneshot::channel();
        hook.download("https://cdn.example/missing.png", move |outcome| {
            let _ = tx.send(outcome);
        });

        let outcome = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        match outcome {
            Err(AdLoadError::Connection { status_code, .. }) => {
                assert_eq!(status_code, Some(404));
            }
            other => panic!("Expected connection error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_stays_silent_when_cancelled() {
        let connection = Arc::new(CountingConnection::new());
        let transaction = open_transaction();
        let hook = DownloadHook::bound(connection, transaction.handle());
        transaction.invalidate();

        let (tx, rx) = oneshot::channel::<AdLoadResult<Bytes>>();
        hook.download("https://cdn.example/a.js", move |outcome| {
            let _ = tx.send(outcome);
        });

        // Sender is dropped without a value once the spawned task finishes.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_custom_strategy() {
        let hook = DownloadHook::new(|url: String| async move { Ok(Bytes::from(url.len().to_string())) });
        assert_eq!(hook.fetch("abcd").await.unwrap(), Bytes::from("4"));
    }
}
