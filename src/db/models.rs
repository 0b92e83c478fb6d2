// Data models: Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic label used for articles that have not been clustered yet.
pub const UNCLUSTERED_TOPIC: i64 = -1;

/// A persisted article with its feature and analysis fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub source: String,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub text: String,
    /// -1.0 (negative) to 1.0 (positive); None until features are computed
    pub sentiment: Option<f64>,
    /// 0.0 (objective) to 1.0 (subjective)
    pub subjectivity: Option<f64>,
    /// Ratio of emotionally charged words to total words
    pub emotive_score: Option<f64>,
    /// Comma-delimited embedding vector (see topics::codec)
    pub embedding: Option<String>,
    /// Cluster label from the most recent clustering run
    pub topic: Option<i64>,
    /// Relative bias score, clamped to [-5, 5]
    pub bias_score: Option<f64>,
}

impl Article {
    /// The topic this article is grouped under for bias scoring.
    pub fn topic_or_unclustered(&self) -> i64 {
        self.topic.unwrap_or(UNCLUSTERED_TOPIC)
    }

    /// Whether the feature extraction step has already processed this article.
    pub fn is_featured(&self) -> bool {
        self.sentiment.is_some()
    }
}

/// A new article coming from the ingestion path. All feature fields start absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub url: String,
    pub source: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    pub text: String,
}

/// Partial update written by feature extraction. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureUpdate {
    pub sentiment: Option<f64>,
    pub subjectivity: Option<f64>,
    pub emotive_score: Option<f64>,
    /// Already serialized with topics::codec::encode_embedding
    pub embedding: Option<String>,
}

impl FeatureUpdate {
    pub fn is_empty(&self) -> bool {
        self.sentiment.is_none()
            && self.subjectivity.is_none()
            && self.emotive_score.is_none()
            && self.embedding.is_none()
    }
}

/// Partial update written by the clustering and bias engine. These are the
/// only fields the engine is allowed to touch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisUpdate {
    pub topic: Option<i64>,
    pub bias_score: Option<f64>,
}

impl AnalysisUpdate {
    pub fn topic(topic: i64) -> Self {
        Self {
            topic: Some(topic),
            bias_score: None,
        }
    }

    pub fn bias_score(score: f64) -> Self {
        Self {
            topic: None,
            bias_score: Some(score),
        }
    }
}

/// Aggregate counts for the status display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    pub total: i64,
    pub featured: i64,
    pub embedded: i64,
    pub scored: i64,
    pub topics: i64,
    pub sources: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_update_default_is_empty() {
        assert!(FeatureUpdate::default().is_empty());
        let update = FeatureUpdate {
            emotive_score: Some(0.0),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_analysis_update_constructors_touch_one_field() {
        assert_eq!(
            AnalysisUpdate::topic(3),
            AnalysisUpdate {
                topic: Some(3),
                bias_score: None
            }
        );
        assert_eq!(AnalysisUpdate::bias_score(1.5).topic, None);
    }

    #[test]
    fn test_new_article_deserializes_without_optional_fields() {
        let json = r#"{"url":"https://example.com/a","source":"Gazette","text":"body"}"#;
        let article: NewArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "");
        assert!(article.published.is_none());
    }
}
