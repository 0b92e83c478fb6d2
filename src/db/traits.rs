// Article store trait: backend-agnostic async interface for all DB operations.
//
// The engine components receive an `Arc<dyn ArticleStore>` instead of reaching
// for a global connection. All methods are async so a sync backend (rusqlite
// behind a Mutex) and a native async backend fit behind the same interface.
//
// The trait mirrors the queries.rs function signatures.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{AnalysisUpdate, Article, ArticleStats, FeatureUpdate, NewArticle};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Articles ---

    /// Store a new article. Returns false if its URL is already stored.
    async fn insert_article(&self, article: &NewArticle) -> Result<bool>;

    /// List up to `limit` articles, most recently published first.
    async fn list_articles(&self, limit: u32) -> Result<Vec<Article>>;

    /// Fetch one article by id.
    async fn get_article(&self, id: i64) -> Result<Option<Article>>;

    /// Apply a partial feature update.
    /// Fails with `EngineError::NotFound` if the article doesn't exist.
    async fn update_features(&self, id: i64, update: &FeatureUpdate) -> Result<()>;

    /// Apply a partial topic / bias update.
    /// Fails with `EngineError::NotFound` if the article doesn't exist.
    async fn update_analysis(&self, id: i64, update: &AnalysisUpdate) -> Result<()>;

    /// Aggregate article counts.
    async fn article_stats(&self) -> Result<ArticleStats>;

    // --- Run state ---

    /// Get a run state value by key (e.g., "last_run_at").
    async fn get_run_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a run state value (upsert).
    async fn set_run_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Run lock ---

    /// Try to take the store-wide run lock. Locks older than
    /// `stale_after_secs` are reclaimed.
    async fn try_acquire_run_lock(&self, owner: &str, stale_after_secs: i64) -> Result<bool>;

    /// Re-stamp the run lock held by `owner`. False means it was reclaimed.
    async fn refresh_run_lock(&self, owner: &str) -> Result<bool>;

    /// Release the run lock held by `owner`.
    async fn release_run_lock(&self, owner: &str) -> Result<()>;
}
