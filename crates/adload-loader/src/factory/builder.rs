//! Per-model creative construction.
//!
//! A build task receives a `BuildJob` (value type) and `BuildDeps` (cloned
//! Arcs), with no access to the factory or the aggregator. It performs the
//! model's eager downloads and turns the model into an `AbstractCreative`.
//!
//! # Transaction discipline
//!
//! - A fetch is never issued under a revoked transaction.
//! - A fetch that completes after revocation is discarded before its bytes
//!   become a `ResolvedAsset`.
//! - Running fetches are never aborted; they finish and are dropped.

use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::Semaphore;

use adload_core::{
    AbstractCreative, AdLoadError, AdLoadResult, CreativeBody, CreativeKind, CreativeModel,
    DownloadHook, HtmlCreative, NativeCreative, ResolvedAsset, ServerConnectionPort,
    TransactionHandle, VideoCreative,
};

/// Dependencies shared by every build task of one factory run.
#[derive(Clone)]
pub struct BuildDeps {
    /// Download channel.
    pub connection: Arc<dyn ServerConnectionPort>,
    /// Read-only view of the load transaction.
    pub transaction: TransactionHandle,
    /// Bounds concurrent asset fetches across the run.
    pub downloads: Arc<Semaphore>,
}

/// One model to construct.
pub struct BuildJob {
    /// Position of the model in the transaction.
    pub index: usize,
    /// The model.
    pub model: Arc<CreativeModel>,
}

/// Construct the creative for `job`.
///
/// # Errors
///
/// - `UnsupportedCreativeKind` for models of unknown kind
/// - `MalformedCreative` when the model fails validation
/// - `Connection` when an eager download fails
/// - `Cancelled` when the transaction is revoked around a download
pub async fn build_creative(job: BuildJob, deps: &BuildDeps) -> AdLoadResult<AbstractCreative> {
    let BuildJob { index, model } = job;

    // HTML models are validated by `HtmlCreative::from_model`
    if model.kind != CreativeKind::Html {
        model
            .validate()
            .map_err(|reason| AdLoadError::malformed(index, reason))?;
    }

    let (body, hook) = match model.kind {
        CreativeKind::Html => {
            let html =
                HtmlCreative::from_model(&model).map_err(|r| AdLoadError::malformed(index, r))?;
            (CreativeBody::Html(html), Some(bound_hook(deps)))
        }
        CreativeKind::Video => {
            let url = model
                .video_url
                .as_deref()
                .ok_or_else(|| AdLoadError::malformed(index, "video creative has no media URL"))?;
            let media = fetch_asset(index, url, deps).await?;
            (CreativeBody::Video(VideoCreative::new(media)), None)
        }
        CreativeKind::Native => {
            let assets = fetch_required_assets(index, &model, deps).await?;
            let deferred: Vec<_> = model.deferred_assets().cloned().collect();
            let hook = (!deferred.is_empty()).then(|| bound_hook(deps));
            (CreativeBody::Native(NativeCreative::new(assets, deferred)), hook)
        }
        CreativeKind::Unknown => {
            return Err(AdLoadError::unsupported_kind(index, model.kind.as_str()));
        }
    };

    let mut creative = AbstractCreative::new(model, deps.transaction.id(), body);
    creative.set_download_hook(hook);

    tracing::debug!(
        target: "adload.factory",
        transaction = %deps.transaction.id(),
        model_index = index,
        kind = %creative.kind(),
        assets = creative.assets().len(),
        "Creative built"
    );

    Ok(creative)
}

fn bound_hook(deps: &BuildDeps) -> DownloadHook {
    DownloadHook::bound(Arc::clone(&deps.connection), deps.transaction.clone())
}

/// Fetch a native model's required assets concurrently.
///
/// Each fetch runs on its own task. The first error returns immediately
/// while the remaining fetches run to completion and are dropped.
async fn fetch_required_assets(
    index: usize,
    model: &CreativeModel,
    deps: &BuildDeps,
) -> AdLoadResult<Vec<(u32, ResolvedAsset)>> {
    let fetches = model
        .native_assets
        .iter()
        .filter(|asset| asset.required)
        .map(|asset| {
            let (id, url) = (asset.id, asset.url.clone());
            let deps = deps.clone();
            let fetch = tokio::spawn(async move {
                fetch_asset(index, &url, &deps)
                    .await
                    .map(|resolved| (id, resolved))
            });
            async move {
                fetch
                    .await
                    .map_err(|e| AdLoadError::other(format!("asset fetch task failed: {e}")))?
            }
        });
    try_join_all(fetches).await
}

/// Fetch one eager asset under the transaction.
async fn fetch_asset(index: usize, url: &str, deps: &BuildDeps) -> AdLoadResult<ResolvedAsset> {
    let _permit = deps
        .downloads
        .acquire()
        .await
        .map_err(|_| AdLoadError::Cancelled)?;

    if !deps.transaction.is_valid() {
        return Err(AdLoadError::Cancelled);
    }

    tracing::debug!(
        target: "adload.factory",
        transaction = %deps.transaction.id(),
        model_index = index,
        url = %url,
        "Fetching asset"
    );
    let result = deps.connection.fetch(url).await;

    if !deps.transaction.is_valid() {
        tracing::debug!(
            target: "adload.factory",
            transaction = %deps.transaction.id(),
            model_index = index,
            url = %url,
            "Discarding download for revoked transaction"
        );
        return Err(AdLoadError::Cancelled);
    }

    let data = result.map_err(|e| AdLoadError::connection(url, Some(index), &e))?;
    Ok(ResolvedAsset::new(url, data))
}
