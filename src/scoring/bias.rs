// Relative bias score formula.
//
// Within a topic, a source's bias is how far its mean sentiment sits from the
// topic-wide mean, in units of the topic's sentiment spread. That deviation
// is blended with a per-article framing signal:
//
//   framing  = subjectivity * emotive_score
//   combined = 0.6 * normalized_bias + 0.4 * framing
//   score    = clamp(combined, -5, 5)
//
// Framing is multiplicative so it stays near zero unless an article is both
// subjective and heavy on emotive vocabulary. Deviation alone can't tell
// "reports bad news plainly" from "frames the news emotionally".

use std::collections::BTreeMap;

use serde::Serialize;

use super::stats::{mean, population_std};
use crate::db::models::Article;

/// Configurable weights for the bias formula.
#[derive(Debug, Clone)]
pub struct BiasWeights {
    /// Weight of the normalized sentiment deviation (default 0.6)
    pub deviation_weight: f64,
    /// Weight of the framing signal (default 0.4)
    pub framing_weight: f64,
    /// Added to the topic spread before dividing (default 1e-6)
    pub epsilon: f64,
    /// Spread used when a topic has fewer than two sentiment values (default 1.0)
    pub singleton_spread: f64,
    /// Scores are clamped to [-max_abs_score, max_abs_score] (default 5.0)
    pub max_abs_score: f64,
}

impl Default for BiasWeights {
    fn default() -> Self {
        Self {
            deviation_weight: 0.6,
            framing_weight: 0.4,
            epsilon: 1e-6,
            singleton_spread: 1.0,
            max_abs_score: 5.0,
        }
    }
}

/// Framing intensity: zero unless both signals are elevated.
pub fn framing_signal(subjectivity: f64, emotive_score: f64) -> f64 {
    subjectivity * emotive_score
}

/// Blend deviation and framing, then clamp.
pub fn combine(normalized_bias: f64, framing: f64, weights: &BiasWeights) -> f64 {
    let combined = weights.deviation_weight * normalized_bias + weights.framing_weight * framing;
    combined.clamp(-weights.max_abs_score, weights.max_abs_score)
}

/// How one source sits relative to its peers on one topic.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSkew {
    pub source: String,
    /// Articles of this source in the topic that have a sentiment value
    pub sentiment_count: usize,
    pub source_mean: f64,
    /// source_mean - topic_mean; positive means more positive than peers
    pub raw_bias: f64,
    /// raw_bias / (topic_std + epsilon)
    pub normalized_bias: f64,
}

/// Sentiment norms for one topic and the skew of each source within it.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub topic: i64,
    pub sentiment_count: usize,
    pub topic_mean: f64,
    pub topic_std: f64,
    /// Sorted by source name
    pub sources: Vec<SourceSkew>,
}

/// A computed score for one article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleBias {
    pub article_id: i64,
    pub topic: i64,
    pub bias_score: f64,
}

/// Result of a full relative-bias computation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BiasComputation {
    /// Topics that had at least one sentiment value, ascending by label
    pub topics: Vec<TopicSummary>,
    /// Scores, ascending by article id
    pub scores: Vec<ArticleBias>,
    /// Topics skipped because none of their articles had sentiment
    pub skipped_topics: usize,
    /// Articles in scored topics left without a new score (missing features)
    pub unscored_articles: usize,
}

/// Compute relative bias scores for all `articles`.
///
/// Articles without a topic are grouped under the synthetic topic -1. An
/// article receives a score when its source has at least one sentiment in
/// the topic and the article's own subjectivity and emotive score are
/// present; everything else keeps its stored value.
/// The result does not depend on the order of `articles`.
pub fn compute_relative_bias(articles: &[Article], weights: &BiasWeights) -> BiasComputation {
    let mut by_topic: BTreeMap<i64, Vec<&Article>> = BTreeMap::new();
    for article in articles {
        by_topic
            .entry(article.topic_or_unclustered())
            .or_default()
            .push(article);
    }

    let mut result = BiasComputation::default();

    for (topic, items) in by_topic {
        let values: Vec<f64> = items.iter().filter_map(|a| a.sentiment).collect();
        let Some(topic_mean) = mean(&values) else {
            result.skipped_topics += 1;
            continue;
        };
        let topic_std = if values.len() < 2 {
            weights.singleton_spread
        } else {
            population_std(&values).unwrap_or(weights.singleton_spread)
        };

        let mut by_source: BTreeMap<&str, Vec<&Article>> = BTreeMap::new();
        for article in &items {
            by_source
                .entry(article.source.as_str())
                .or_default()
                .push(article);
        }

        let mut sources = Vec::new();
        for (source, source_items) in by_source {
            let source_values: Vec<f64> = source_items.iter().filter_map(|a| a.sentiment).collect();
            let Some(source_mean) = mean(&source_values) else {
                result.unscored_articles += source_items.len();
                continue;
            };
            let raw_bias = source_mean - topic_mean;
            let normalized_bias = raw_bias / (topic_std + weights.epsilon);

            for article in &source_items {
                match (article.subjectivity, article.emotive_score) {
                    (Some(subjectivity), Some(emotive)) => {
                        let framing = framing_signal(subjectivity, emotive);
                        result.scores.push(ArticleBias {
                            article_id: article.id,
                            topic,
                            bias_score: combine(normalized_bias, framing, weights),
                        });
                    }
                    _ => result.unscored_articles += 1,
                }
            }

            sources.push(SourceSkew {
                source: source.to_string(),
                sentiment_count: source_values.len(),
                source_mean,
                raw_bias,
                normalized_bias,
            });
        }

        result.topics.push(TopicSummary {
            topic,
            sentiment_count: values.len(),
            topic_mean,
            topic_std,
            sources,
        });
    }

    result.scores.sort_by_key(|s| s.article_id);
    result
}
