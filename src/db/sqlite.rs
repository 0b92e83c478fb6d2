// SqliteDatabase: rusqlite backend implementing the ArticleStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Every trait method locks the mutex, opens a transaction, runs the
// synchronous query functions from queries.rs, and commits. An early return
// drops the transaction, which rolls it back, so no exit path leaves one open.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{AnalysisUpdate, Article, ArticleStats, FeatureUpdate, NewArticle};
use super::queries;
use super::traits::ArticleStore;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `op` inside a transaction scoped to this call.
    async fn with_transaction<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send,
        T: Send,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let value = op(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[async_trait]
impl ArticleStore for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<bool> {
        self.with_transaction(|conn| queries::insert_article(conn, article))
            .await
    }

    async fn list_articles(&self, limit: u32) -> Result<Vec<Article>> {
        self.with_transaction(|conn| queries::list_articles(conn, limit))
            .await
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.with_transaction(|conn| queries::get_article(conn, id))
            .await
    }

    async fn update_features(&self, id: i64, update: &FeatureUpdate) -> Result<()> {
        self.with_transaction(|conn| queries::update_features(conn, id, update))
            .await
    }

    async fn update_analysis(&self, id: i64, update: &AnalysisUpdate) -> Result<()> {
        self.with_transaction(|conn| queries::update_analysis(conn, id, update))
            .await
    }

    async fn article_stats(&self) -> Result<ArticleStats> {
        self.with_transaction(queries::article_stats).await
    }

    async fn get_run_state(&self, key: &str) -> Result<Option<String>> {
        self.with_transaction(|conn| queries::get_run_state(conn, key))
            .await
    }

    async fn set_run_state(&self, key: &str, value: &str) -> Result<()> {
        self.with_transaction(|conn| queries::set_run_state(conn, key, value))
            .await
    }

    async fn try_acquire_run_lock(&self, owner: &str, stale_after_secs: i64) -> Result<bool> {
        self.with_transaction(|conn| queries::try_acquire_run_lock(conn, owner, stale_after_secs))
            .await
    }

    async fn refresh_run_lock(&self, owner: &str) -> Result<bool> {
        self.with_transaction(|conn| queries::refresh_run_lock(conn, owner))
            .await
    }

    async fn release_run_lock(&self, owner: &str) -> Result<()> {
        self.with_transaction(|conn| queries::release_run_lock(conn, owner))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use crate::error::EngineError;

    async fn test_db() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteDatabase::new(conn)
    }

    fn article(url: &str) -> NewArticle {
        NewArticle {
            url: url.to_string(),
            source: "Gazette".to_string(),
            title: "Headline".to_string(),
            published: None,
            text: "Body text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_trait_insert_and_list() {
        let db = test_db().await;
        assert!(db.insert_article(&article("https://g.example/1")).await.unwrap());
        assert!(!db.insert_article(&article("https://g.example/1")).await.unwrap());
        let listed = db.list_articles(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source, "Gazette");
    }

    #[tokio::test]
    async fn test_trait_update_analysis_roundtrip() {
        let db = test_db().await;
        db.insert_article(&article("https://g.example/1")).await.unwrap();
        let id = db.list_articles(1).await.unwrap()[0].id;

        db.update_analysis(id, &AnalysisUpdate::topic(3)).await.unwrap();
        let stored = db.get_article(id).await.unwrap().unwrap();
        assert_eq!(stored.topic, Some(3));
    }

    #[tokio::test]
    async fn test_trait_failed_update_rolls_back_and_reports_not_found() {
        let db = test_db().await;
        let err = db
            .update_analysis(12345, &AnalysisUpdate::bias_score(1.0))
            .await
            .unwrap_err();
        assert!(EngineError::is_not_found(&err));

        // The connection is usable afterwards (no dangling transaction)
        db.set_run_state("k", "v").await.unwrap();
        assert_eq!(db.get_run_state("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_trait_run_lock() {
        let db = test_db().await;
        assert!(db.try_acquire_run_lock("a", 3600).await.unwrap());
        assert!(!db.try_acquire_run_lock("b", 3600).await.unwrap());
        db.release_run_lock("a").await.unwrap();
        assert!(db.try_acquire_run_lock("b", 3600).await.unwrap());
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let db = test_db().await;
        assert_eq!(db.table_count().await.unwrap(), 4);
    }
}
