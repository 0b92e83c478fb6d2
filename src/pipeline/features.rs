// Feature extraction step: fill in NLP features for articles that lack them.
//
// An article is a candidate while its sentiment is absent, so a finished
// article is never recomputed and an interrupted run resumes where it
// stopped. Each of the four signals fails independently; whatever succeeded
// is written, the rest stays absent for the next run.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use super::lease::RunLease;
use crate::db::models::{Article, FeatureUpdate};
use crate::db::ArticleStore;
use crate::error::EngineError;
use crate::nlp::traits::FeatureAnalyzer;
use crate::topics::codec::encode_embedding;

/// What a feature pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureOutcome {
    /// Articles that still needed features
    pub candidates: usize,
    /// Articles with every signal written
    pub complete: usize,
    /// Articles where some but not all signals succeeded
    pub partial: usize,
    /// Articles where every signal failed (left untouched)
    pub failed: usize,
    /// Writes that failed because the article vanished
    pub update_failures: usize,
}

/// Compute and store features for every article in the window that has no
/// sentiment yet. The run lease is renewed between articles when due.
pub async fn extract_missing_features(
    store: &dyn ArticleStore,
    analyzer: &dyn FeatureAnalyzer,
    limit: u32,
    lease: &mut RunLease,
) -> Result<FeatureOutcome> {
    let articles = store.list_articles(limit).await?;
    let pending: Vec<&Article> = articles.iter().filter(|a| !a.is_featured()).collect();

    let mut outcome = FeatureOutcome {
        candidates: pending.len(),
        ..FeatureOutcome::default()
    };

    if pending.is_empty() {
        info!("All articles already have features");
        return Ok(outcome);
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Features [{bar:30}] {pos}/{len} ({eta})")
            .expect("valid template"),
    );

    for article in pending {
        if let Err(e) = lease.renew_if_due(store).await {
            pb.finish_and_clear();
            return Err(e);
        }
        let update = analyze(analyzer, article).await;

        if update.is_empty() {
            outcome.failed += 1;
            pb.inc(1);
            continue;
        }

        let complete = update.sentiment.is_some()
            && update.subjectivity.is_some()
            && update.emotive_score.is_some()
            && update.embedding.is_some();

        match store.update_features(article.id, &update).await {
            Ok(()) if complete => outcome.complete += 1,
            Ok(()) => outcome.partial += 1,
            Err(e) if EngineError::is_not_found(&e) => {
                warn!(article_id = article.id, error = %e, "Feature update skipped");
                outcome.update_failures += 1;
            }
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        candidates = outcome.candidates,
        complete = outcome.complete,
        partial = outcome.partial,
        failed = outcome.failed,
        "Feature extraction finished"
    );

    Ok(outcome)
}

/// Run all four signals on one article, keeping whichever succeeded.
async fn analyze(analyzer: &dyn FeatureAnalyzer, article: &Article) -> FeatureUpdate {
    let text = article.text.as_str();

    let sentiment = analyzer.sentiment(text).await;
    let subjectivity = analyzer.subjectivity(text).await;
    let emotive = analyzer.emotive_ratio(text).await;
    let embedding = analyzer.embedding(text).await.and_then(|v| {
        if v.is_empty() {
            anyhow::bail!("embedding has no dimensions");
        }
        if v.iter().any(|x| !x.is_finite()) {
            anyhow::bail!("embedding contains non-finite values");
        }
        Ok(encode_embedding(&v))
    });

    FeatureUpdate {
        sentiment: keep(article.id, "sentiment", sentiment),
        subjectivity: keep(article.id, "subjectivity", subjectivity),
        emotive_score: keep(article.id, "emotive_score", emotive),
        embedding: keep(article.id, "embedding", embedding),
    }
}

fn keep<T>(article_id: i64, feature: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            let err = EngineError::UpstreamFeature {
                article_id,
                feature,
                reason: format!("{e:#}"),
            };
            warn!(error = %err, "Feature unavailable, will retry next run");
            None
        }
    }
}
