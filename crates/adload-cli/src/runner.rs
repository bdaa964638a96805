//! Command execution.
//!
//! `run_load` drives one attempt through `AdLoadManager` and turns the
//! delegate's answer into a `LoadReport`; `check_input` validates models
//! offline.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::oneshot;

use adload_core::{
    AbstractCreative, AdLoadError, AdLoadManagerDelegate, CreativeKind, ServerConnectionPort,
};
use adload_loader::AdLoadManager;

use crate::fixture::LoadInput;

type Outcome = Result<Vec<AbstractCreative>, AdLoadError>;

/// Delegate that hands the single result to a waiting task.
struct OneshotDelegate {
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl OneshotDelegate {
    fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let delegate = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
        });
        (delegate, rx)
    }

    fn send(&self, outcome: Outcome) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            let _ = tx.send(outcome);
        }
    }
}

impl AdLoadManagerDelegate for OneshotDelegate {
    fn creatives_ready(&self, creatives: Vec<AbstractCreative>) {
        self.send(Ok(creatives));
    }

    fn load_failed(&self, error: AdLoadError) {
        self.send(Err(error));
    }
}

/// One downloaded asset in a report.
#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub url: String,
    pub bytes: usize,
}

/// One built creative in a report.
#[derive(Debug, Clone, Serialize)]
pub struct CreativeSummary {
    pub index: usize,
    pub kind: CreativeKind,
    pub assets: Vec<AssetSummary>,
    pub deferred_assets: usize,
    pub download_hook: bool,
}

impl CreativeSummary {
    fn from_creative(index: usize, creative: &AbstractCreative) -> Self {
        Self {
            index,
            kind: creative.kind(),
            assets: creative
                .assets()
                .into_iter()
                .map(|asset| AssetSummary {
                    url: asset.url.clone(),
                    bytes: asset.data.len(),
                })
                .collect(),
            deferred_assets: creative.as_native().map_or(0, |n| n.deferred().len()),
            download_hook: creative.download_hook().is_some(),
        }
    }
}

/// Result of `adload load`.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub bid_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub elapsed_ms: u64,
    pub creatives: Vec<CreativeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AdLoadError>,
}

impl LoadReport {
    /// Whether the load produced creatives.
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = format!("Bid {} ({} ms)\n", self.bid_id, self.elapsed_ms);
        if let Some(error) = &self.error {
            out.push_str(&format!("  failed: {}\n", error.user_message()));
            return out;
        }
        for creative in &self.creatives {
            out.push_str(&format!(
                "  #{} {}: {} asset(s)",
                creative.index,
                creative.kind,
                creative.assets.len()
            ));
            if creative.deferred_assets > 0 {
                out.push_str(&format!(", {} deferred", creative.deferred_assets));
            }
            if creative.download_hook {
                out.push_str(", download-hook");
            }
            out.push('\n');
            for asset in &creative.assets {
                out.push_str(&format!("      {} ({} bytes)\n", asset.url, asset.bytes));
            }
        }
        out
    }
}

/// Run one load attempt.
pub async fn run_load(
    input: LoadInput,
    connection: Arc<dyn ServerConnectionPort>,
) -> anyhow::Result<LoadReport> {
    let LoadInput {
        bid,
        ad_configuration,
        creatives,
    } = input;
    let started = Instant::now();

    let manager = AdLoadManager::new(bid, connection, ad_configuration);
    let (delegate, outcome) = OneshotDelegate::new();
    manager.set_delegate(&delegate);
    manager.make_creatives(creatives);

    let outcome = outcome
        .await
        .context("Load attempt ended without notifying its delegate")?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (creatives, error) = match outcome {
        Ok(creatives) => (
            creatives
                .iter()
                .enumerate()
                .map(|(index, creative)| CreativeSummary::from_creative(index, creative))
                .collect(),
            None,
        ),
        Err(error) => (Vec::new(), Some(error)),
    };

    Ok(LoadReport {
        bid_id: manager.bid().id.clone(),
        transaction_id: manager.transaction_id().map(|id| id.to_string()),
        elapsed_ms,
        creatives,
        error,
    })
}

/// Offline verdict for one model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCheck {
    pub index: usize,
    pub kind: CreativeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    pub eager_downloads: usize,
}

/// Result of `adload check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub bid_id: String,
    pub winning_bid: bool,
    pub models: Vec<ModelCheck>,
}

impl CheckReport {
    /// Whether every model can be built.
    pub fn is_loadable(&self) -> bool {
        !self.models.is_empty() && self.models.iter().all(|m| m.problem.is_none())
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Bid {}{}\n",
            self.bid_id,
            if self.winning_bid { " (winning)" } else { "" }
        );
        if self.models.is_empty() {
            out.push_str("  no creative models\n");
        }
        for model in &self.models {
            match &model.problem {
                Some(problem) => {
                    out.push_str(&format!("  #{} {}: {problem}\n", model.index, model.kind));
                }
                None => out.push_str(&format!(
                    "  #{} {}: ok, {} eager download(s)\n",
                    model.index, model.kind, model.eager_downloads
                )),
            }
        }
        out
    }
}

/// Validate every model of `input` without touching the network.
pub fn check_input(input: &LoadInput) -> CheckReport {
    let models = input
        .creatives
        .iter()
        .enumerate()
        .map(|(index, model)| {
            let problem = if model.kind == CreativeKind::Unknown {
                Some("unsupported creative kind".to_string())
            } else {
                model.validate().err()
            };
            ModelCheck {
                index,
                kind: model.kind,
                problem,
                eager_downloads: model.eager_asset_urls().len(),
            }
        })
        .collect();

    CheckReport {
        bid_id: input.bid.id.clone(),
        winning_bid: input.bid.is_winning(),
        models,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adload_core::{AdConfiguration, Bid, ConnectionError, CreativeModel, NativeAsset};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct StaticConnection;

    #[async_trait]
    impl ServerConnectionPort for StaticConnection {
        async fn fetch(&self, url: &str) -> Result<Bytes, ConnectionError> {
            if url.contains("broken") {
                return Err(ConnectionError::with_status("not found", 404));
            }
            Ok(Bytes::from_static(b"0123456789"))
        }
    }

    fn input(creatives: Vec<CreativeModel>) -> LoadInput {
        LoadInput {
            bid: Bid::new("bid-42", 3.0),
            ad_configuration: AdConfiguration::default(),
            creatives,
        }
    }

    #[tokio::test]
    async fn test_successful_load_report() {
        let report = run_load(
            input(vec![
                CreativeModel::html("<p>ad</p>"),
                CreativeModel::video("https://cdn.example/v.mp4"),
            ]),
            Arc::new(StaticConnection),
        )
        .await
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.bid_id, "bid-42");
        assert!(report.transaction_id.is_some());
        assert_eq!(report.creatives.len(), 2);
        assert!(report.creatives[0].download_hook);
        assert_eq!(report.creatives[1].assets[0].bytes, 10);
        assert!(report.render().contains("#1 video: 1 asset(s)"));
    }

    #[tokio::test]
    async fn test_failed_load_report() {
        let report = run_load(
            input(vec![CreativeModel::video("https://cdn.example/broken.mp4")]),
            Arc::new(StaticConnection),
        )
        .await
        .unwrap();

        assert!(!report.is_success());
        assert!(report.creatives.is_empty());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"]["code"], "connection");
        assert!(report.render().contains("failed:"));
    }

    #[test]
    fn test_check_flags_problems() {
        let report = check_input(&input(vec![
            CreativeModel::html("<VAST version=\"4.0\"/>"),
            CreativeModel::native(vec![
                NativeAsset::new(1, "https://cdn.example/icon.png", true),
                NativeAsset::new(2, "https://cdn.example/main.png", false),
            ]),
            CreativeModel::unknown(),
        ]));

        assert!(!report.is_loadable());
        assert!(report.models[0].problem.is_some());
        assert!(report.models[1].problem.is_none());
        assert_eq!(report.models[1].eager_downloads, 1);
        assert_eq!(
            report.models[2].problem.as_deref(),
            Some("unsupported creative kind")
        );
    }

    #[test]
    fn test_empty_fixture_is_not_loadable() {
        let report = check_input(&input(Vec::new()));
        assert!(!report.is_loadable());
        assert!(report.render().contains("no creative models"));
    }
}
