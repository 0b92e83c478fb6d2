// Relative bias scoring: per-topic, per-source sentiment deviation blended
// with framing, written back per article.

pub mod bias;
pub mod stats;
pub mod summary;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::models::AnalysisUpdate;
use crate::db::ArticleStore;
use crate::error::EngineError;
use bias::{compute_relative_bias, BiasWeights};

/// What a bias pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BiasOutcome {
    /// Articles whose bias_score was written
    pub scored: usize,
    /// Topic groups that had at least one sentiment
    pub topics: usize,
    /// Articles in those groups left unscored for missing features
    pub unscored: usize,
    /// Writes that failed because the article vanished
    pub update_failures: usize,
}

/// Recompute and persist the bias score of every eligible article.
///
/// Reads the `limit` most recent articles. With no sentiment anywhere this
/// is a logged no-op. A `NotFound` on one article is logged and counted;
/// any other store error aborts the pass.
pub async fn apply_relative_bias(
    store: &dyn ArticleStore,
    weights: &BiasWeights,
    limit: u32,
) -> Result<BiasOutcome> {
    let articles = store.list_articles(limit).await?;
    let computation = compute_relative_bias(&articles, weights);

    if computation.topics.is_empty() {
        info!(reason = %EngineError::EmptyInput("no sentiments"), "Skipping bias scoring");
        return Ok(BiasOutcome::default());
    }

    for topic in &computation.topics {
        debug!(
            topic = topic.topic,
            values = topic.sentiment_count,
            mean = topic.topic_mean,
            std = topic.topic_std,
            "Topic sentiment norms"
        );
    }

    let mut outcome = BiasOutcome {
        topics: computation.topics.len(),
        unscored: computation.unscored_articles,
        ..BiasOutcome::default()
    };

    for score in &computation.scores {
        let update = AnalysisUpdate::bias_score(score.bias_score);
        match store.update_analysis(score.article_id, &update).await {
            Ok(()) => outcome.scored += 1,
            Err(e) if EngineError::is_not_found(&e) => {
                warn!(article_id = score.article_id, error = %e, "Bias update skipped");
                outcome.update_failures += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        scored = outcome.scored,
        topics = outcome.topics,
        unscored = outcome.unscored,
        "Bias scores written"
    );

    Ok(outcome)
}
