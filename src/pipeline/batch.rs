// Batch orchestrator: features -> clustering -> bias, under a single-run lock.
//
// Two locks guard a run. The in-process mutex rejects a second trigger in
// the same process immediately; the store's lock row serializes separate
// processes sharing one database. Both are held for the whole batch and the
// row is released on every exit path. The row is re-stamped before each step
// and during feature extraction; if another process reclaimed it, the run
// stops with `EngineError::LockLost` before touching anything else.
//
// Failure scoping: a store that can't list articles for the feature step
// aborts the run. Clustering and bias failures are recorded in the summary
// and the next step still runs.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::features::{extract_missing_features, FeatureOutcome};
use super::lease::RunLease;
use crate::db::ArticleStore;
use crate::error::EngineError;
use crate::nlp::traits::FeatureAnalyzer;
use crate::scoring::bias::BiasWeights;
use crate::scoring::{apply_relative_bias, BiasOutcome};
use crate::topics::traits::TopicClusterer;
use crate::topics::{cluster_topics, ClusterOptions, ClusterOutcome};

/// run_state key holding the RFC3339 time the last batch finished.
pub const LAST_RUN_AT: &str = "last_run_at";
/// run_state key holding the status label of the last batch.
pub const LAST_RUN_STATUS: &str = "last_run_status";

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub cluster: ClusterOptions,
    pub weights: BiasWeights,
    /// Store locks older than this are considered abandoned
    pub lock_stale_secs: i64,
}

/// Result of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus<T> {
    Completed(T),
    Skipped(&'static str),
    Failed(String),
}

impl<T> StepStatus<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            StepStatus::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Per-step outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub features: StepStatus<FeatureOutcome>,
    pub clustering: StepStatus<ClusterOutcome>,
    pub bias: StepStatus<BiasOutcome>,
}

impl RunSummary {
    /// "ok" when no step failed, otherwise "partial".
    pub fn status_label(&self) -> &'static str {
        if self.features.is_failed() || self.clustering.is_failed() || self.bias.is_failed() {
            "partial"
        } else {
            "ok"
        }
    }
}

/// The batch pipeline with its collaborators injected.
pub struct Pipeline {
    store: Arc<dyn ArticleStore>,
    analyzer: Option<Arc<dyn FeatureAnalyzer>>,
    clusterer: Arc<dyn TopicClusterer>,
    settings: PipelineSettings,
    run_lock: Mutex<()>,
}

impl Pipeline {
    /// Without an analyzer the feature step is skipped.
    pub fn new(
        store: Arc<dyn ArticleStore>,
        analyzer: Option<Arc<dyn FeatureAnalyzer>>,
        clusterer: Arc<dyn TopicClusterer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            analyzer,
            clusterer,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    /// Run the full batch: features, then clustering, then bias.
    ///
    /// Errors only when the store is unavailable or the lock is held by
    /// (`EngineError::RunInProgress`) or lost to (`EngineError::LockLost`)
    /// another run.
    pub async fn run(&self) -> Result<RunSummary> {
        let (_guard, mut lease) = self.acquire().await?;
        let started_at = Utc::now();

        let result = self.run_steps(started_at, &mut lease).await;
        self.record_run(&result).await;
        self.release(lease.owner()).await;

        result
    }

    /// Re-cluster only. `topic_count` overrides the configured k.
    pub async fn run_clustering(&self, topic_count: Option<usize>) -> Result<ClusterOutcome> {
        let (_guard, lease) = self.acquire().await?;

        let mut options = self.settings.cluster.clone();
        if let Some(k) = topic_count {
            options.topic_count = k;
        }
        let result = cluster_topics(self.store.as_ref(), self.clusterer.as_ref(), &options).await;

        self.release(lease.owner()).await;
        result
    }

    /// Recompute bias scores only.
    pub async fn run_bias(&self) -> Result<BiasOutcome> {
        let (_guard, lease) = self.acquire().await?;
        let result = apply_relative_bias(
            self.store.as_ref(),
            &self.settings.weights,
            self.settings.cluster.article_limit,
        )
        .await;
        self.release(lease.owner()).await;
        result
    }

    async fn run_steps(&self, started_at: DateTime<Utc>, lease: &mut RunLease) -> Result<RunSummary> {
        let store = self.store.as_ref();
        let limit = self.settings.cluster.article_limit;

        let features = match &self.analyzer {
            Some(analyzer) => {
                info!("Step 1/3: feature extraction");
                lease.renew(store).await?;
                StepStatus::Completed(
                    extract_missing_features(store, analyzer.as_ref(), limit, lease).await?,
                )
            }
            None => {
                info!("Step 1/3: feature extraction skipped (no analyzer)");
                StepStatus::Skipped("no feature analyzer configured")
            }
        };

        info!("Step 2/3: topic clustering");
        lease.renew(store).await?;
        let clustering = match cluster_topics(store, self.clusterer.as_ref(), &self.settings.cluster)
            .await
        {
            Ok(outcome) => StepStatus::Completed(outcome),
            Err(e) => {
                warn!(error = %e, "Clustering failed, keeping previous topic labels");
                StepStatus::Failed(format!("{e:#}"))
            }
        };

        info!("Step 3/3: relative bias");
        lease.renew(store).await?;
        let bias = match apply_relative_bias(store, &self.settings.weights, limit).await {
            Ok(outcome) => StepStatus::Completed(outcome),
            Err(e) => {
                warn!(error = %e, "Bias scoring failed");
                StepStatus::Failed(format!("{e:#}"))
            }
        };

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            features,
            clustering,
            bias,
        })
    }

    /// Take the in-process lock, then the store lock row.
    async fn acquire(&self) -> Result<(MutexGuard<'_, ()>, RunLease)> {
        let guard = self
            .run_lock
            .try_lock()
            .map_err(|_| EngineError::RunInProgress)?;

        let owner = lock_owner();
        let acquired = self
            .store
            .try_acquire_run_lock(&owner, self.settings.lock_stale_secs)
            .await?;
        if !acquired {
            return Err(EngineError::RunInProgress.into());
        }
        Ok((guard, RunLease::new(owner, self.settings.lock_stale_secs)))
    }

    async fn release(&self, owner: &str) {
        if let Err(e) = self.store.release_run_lock(owner).await {
            warn!(owner, error = %e, "Failed to release run lock; it expires once stale");
        }
    }

    async fn record_run(&self, result: &Result<RunSummary>) {
        let (finished_at, status) = match result {
            Ok(summary) => (summary.finished_at, summary.status_label().to_string()),
            Err(e) => (Utc::now(), format!("failed: {e:#}")),
        };
        let finished = finished_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        for (key, value) in [(LAST_RUN_AT, finished.as_str()), (LAST_RUN_STATUS, status.as_str())] {
            if let Err(e) = self.store.set_run_state(key, value).await {
                warn!(key, error = %e, "Failed to record run state");
            }
        }
    }
}

/// Identifies this run in the store lock row.
fn lock_owner() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}:{}", std::process::id(), nanos)
}
