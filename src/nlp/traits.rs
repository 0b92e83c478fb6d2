// Feature analyzer trait: the swap-ready NLP abstraction.
//
// Four independent signals per article. Each can fail on its own; the
// feature step records whichever succeeded and leaves the rest absent so
// the next run retries them.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait FeatureAnalyzer: Send + Sync {
    /// Signed sentiment in [-1, 1]. Positive means positive tone.
    async fn sentiment(&self, text: &str) -> Result<f64>;

    /// Subjectivity in [0, 1]. 0 is purely factual.
    async fn subjectivity(&self, text: &str) -> Result<f64>;

    /// Fraction of words that are emotive, in [0, 1].
    async fn emotive_ratio(&self, text: &str) -> Result<f64>;

    /// Dense semantic vector of the text.
    async fn embedding(&self, text: &str) -> Result<Vec<f64>>;
}
