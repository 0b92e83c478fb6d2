// Per-article NLP features: sentiment, subjectivity, emotive density and a
// sentence embedding.

pub mod download;
pub mod embeddings;
pub mod lexicon;
pub mod sentiment;
pub mod traits;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use embeddings::SentenceEmbedder;
use sentiment::SentimentClassifier;
use traits::FeatureAnalyzer;

/// Characters of article text each signal looks at.
pub const SENTIMENT_CHARS: usize = 512;
pub const SUBJECTIVITY_CHARS: usize = 2000;
pub const EMBEDDING_CHARS: usize = 1000;

/// The first `max_chars` characters of `text`, on a char boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Analyzer that runs both ONNX models on the local CPU.
pub struct LocalAnalyzer {
    sentiment: SentimentClassifier,
    embedder: SentenceEmbedder,
}

impl LocalAnalyzer {
    /// Load both models from `model_dir` (the layout `download_models` writes).
    pub fn load(model_dir: &Path) -> Result<Self> {
        Ok(Self {
            sentiment: SentimentClassifier::load(&download::sentiment_model_dir(model_dir))?,
            embedder: SentenceEmbedder::load(&download::embedding_model_dir(model_dir))?,
        })
    }
}

#[async_trait]
impl FeatureAnalyzer for LocalAnalyzer {
    async fn sentiment(&self, text: &str) -> Result<f64> {
        self.sentiment
            .classify(char_prefix(text, SENTIMENT_CHARS))
            .await
    }

    async fn subjectivity(&self, text: &str) -> Result<f64> {
        Ok(lexicon::subjectivity(char_prefix(text, SUBJECTIVITY_CHARS)))
    }

    async fn emotive_ratio(&self, text: &str) -> Result<f64> {
        Ok(lexicon::emotive_ratio(text))
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f64>> {
        self.embedder.embed(char_prefix(text, EMBEDDING_CHARS)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_prefix_shorter_text() {
        assert_eq!(char_prefix("short", 10), "short");
    }

    #[test]
    fn test_char_prefix_respects_multibyte() {
        assert_eq!(char_prefix("héllo wörld", 4), "héll");
        assert_eq!(char_prefix("🎉🎉🎉", 2), "🎉🎉");
    }

    #[test]
    fn test_char_prefix_zero() {
        assert_eq!(char_prefix("abc", 0), "");
    }
}
