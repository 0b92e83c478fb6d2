// Topic clustering: groups articles by embedding similarity.
//
// Reads every embedded article from the store, validates the vectors, runs
// the clusterer, optionally aligns the new labels with the previous run, and
// writes each label back. Validation happens before any write, so a
// malformed embedding leaves all prior topic labels untouched.

pub mod cluster;
pub mod codec;
pub mod stable;
pub mod traits;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::models::{AnalysisUpdate, Article};
use crate::db::ArticleStore;
use crate::error::EngineError;
use traits::TopicClusterer;

/// Default number of topics requested per clustering run.
pub const DEFAULT_TOPIC_COUNT: usize = 12;

/// Settings for one clustering pass.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Requested number of topics (k). The run uses min(k, embedded articles).
    pub topic_count: usize,
    /// Map new clusters onto the previous run's labels by nearest centroid.
    pub stable_labels: bool,
    /// How many of the most recent articles to consider.
    pub article_limit: u32,
}

/// What a clustering pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterOutcome {
    /// Articles that had an embedding and received a label
    pub processed: usize,
    /// Distinct labels assigned (k')
    pub clusters: usize,
    /// Label writes that failed because the article vanished
    pub update_failures: usize,
}

/// Embedded articles ready for clustering: ids, vectors and their previous topics.
#[derive(Debug, Default)]
pub struct EmbeddingSet {
    pub ids: Vec<i64>,
    pub vectors: Vec<Vec<f64>>,
    pub previous_topics: Vec<Option<i64>>,
}

/// Decode and validate the embeddings of `articles`.
///
/// Articles without an embedding are skipped. Any unparsable or non-finite
/// vector, or a dimensionality that differs from the first embedded article,
/// fails the whole set with `EngineError::FeatureFormat`.
pub fn collect_embeddings(articles: &[Article]) -> Result<EmbeddingSet, EngineError> {
    let mut set = EmbeddingSet::default();
    let mut dimension: Option<usize> = None;

    for article in articles {
        let Some(raw) = article.embedding.as_deref() else {
            continue;
        };
        let vector = codec::decode_embedding(raw).map_err(|e| EngineError::FeatureFormat {
            article_id: article.id,
            reason: e.to_string(),
        })?;
        let Some(vector) = vector else {
            continue;
        };

        match dimension {
            None => dimension = Some(vector.len()),
            Some(expected) if expected != vector.len() => {
                return Err(EngineError::FeatureFormat {
                    article_id: article.id,
                    reason: format!(
                        "expected {expected} dimensions, found {}",
                        vector.len()
                    ),
                });
            }
            Some(_) => {}
        }

        set.ids.push(article.id);
        set.vectors.push(vector);
        set.previous_topics.push(article.topic);
    }

    Ok(set)
}

/// Re-cluster every embedded article in the store and persist the labels.
pub async fn cluster_topics(
    store: &dyn ArticleStore,
    clusterer: &dyn TopicClusterer,
    options: &ClusterOptions,
) -> Result<ClusterOutcome> {
    let articles = store.list_articles(options.article_limit).await?;
    let set = collect_embeddings(&articles)?;

    if set.vectors.is_empty() {
        info!(reason = %EngineError::EmptyInput("no embeddings"), "Skipping clustering");
        return Ok(ClusterOutcome::default());
    }

    let mut labels = clusterer.assign(&set.vectors, options.topic_count);
    if options.stable_labels {
        labels = stable::align_with_previous(&labels, &set.vectors, &set.previous_topics);
    }
    let clusters = labels.iter().max().map_or(0, |&max| max + 1);

    info!(
        articles = set.ids.len(),
        requested = options.topic_count,
        clusters,
        "Clustered embeddings"
    );

    let mut outcome = ClusterOutcome {
        processed: 0,
        clusters,
        update_failures: 0,
    };

    for (&id, &label) in set.ids.iter().zip(&labels) {
        match store.update_analysis(id, &AnalysisUpdate::topic(label as i64)).await {
            Ok(()) => outcome.processed += 1,
            Err(e) if EngineError::is_not_found(&e) => {
                warn!(article_id = id, error = %e, "Topic update skipped");
                outcome.update_failures += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: i64, embedding: Option<&str>) -> Article {
        Article {
            id,
            url: format!("https://news.example/{id}"),
            source: "Gazette".to_string(),
            title: String::new(),
            published: None,
            text: String::new(),
            sentiment: None,
            subjectivity: None,
            emotive_score: None,
            embedding: embedding.map(str::to_string),
            topic: None,
            bias_score: None,
        }
    }

    #[test]
    fn test_collect_skips_missing_and_empty() {
        let articles = vec![
            article(1, Some("0.1,0.2")),
            article(2, None),
            article(3, Some("")),
            article(4, Some("0.3,0.4")),
        ];
        let set = collect_embeddings(&articles).unwrap();
        assert_eq!(set.ids, vec![1, 4]);
        assert_eq!(set.vectors[1], vec![0.3, 0.4]);
    }

    #[test]
    fn test_collect_rejects_dimension_mismatch() {
        let articles = vec![article(1, Some("0.1,0.2")), article(2, Some("0.1,0.2,0.3"))];
        match collect_embeddings(&articles) {
            Err(EngineError::FeatureFormat { article_id, .. }) => assert_eq!(article_id, 2),
            other => panic!("expected FeatureFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_rejects_garbage() {
        let articles = vec![article(9, Some("[0.1, 0.2]"))];
        assert!(matches!(
            collect_embeddings(&articles),
            Err(EngineError::FeatureFormat { article_id: 9, .. })
        ));
    }

    #[test]
    fn test_collect_keeps_previous_topics() {
        let mut a = article(1, Some("1,2"));
        a.topic = Some(5);
        let set = collect_embeddings(&[a]).unwrap();
        assert_eq!(set.previous_topics, vec![Some(5)]);
    }
}
