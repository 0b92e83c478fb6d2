// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{AnalysisUpdate, Article, ArticleStats, FeatureUpdate, NewArticle};
use crate::error::EngineError;

const ARTICLE_COLUMNS: &str = "id, url, source, title, published, text, sentiment, \
     subjectivity, emotive_score, embedding, topic, bias_score";

// --- Articles ---

/// Insert an article unless its URL is already stored.
/// Returns true when a new row was created.
pub fn insert_article(conn: &Connection, article: &NewArticle) -> Result<bool> {
    let published = article.published.map(format_timestamp);
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO articles (url, source, title, published, text)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            article.url,
            article.source,
            article.title,
            published,
            article.text
        ],
    )?;
    Ok(inserted > 0)
}

/// List articles, most recently published first. Articles without a
/// publication date come last, newest insert first.
pub fn list_articles(conn: &Connection, limit: u32) -> Result<Vec<Article>> {
    let sql = format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles
         ORDER BY published IS NULL, published DESC, id DESC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], row_to_article)?;

    let mut articles = Vec::new();
    for row in rows {
        articles.push(row?);
    }
    Ok(articles)
}

/// Fetch a single article by id.
pub fn get_article(conn: &Connection, id: i64) -> Result<Option<Article>> {
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1");
    let article = conn
        .query_row(&sql, params![id], row_to_article)
        .optional()?;
    Ok(article)
}

/// Apply a partial feature update. Fields set to None keep their stored value.
pub fn update_features(conn: &Connection, id: i64, update: &FeatureUpdate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE articles SET
            sentiment = COALESCE(?2, sentiment),
            subjectivity = COALESCE(?3, subjectivity),
            emotive_score = COALESCE(?4, emotive_score),
            embedding = COALESCE(?5, embedding)
         WHERE id = ?1",
        params![
            id,
            update.sentiment,
            update.subjectivity,
            update.emotive_score,
            update.embedding
        ],
    )?;
    if changed == 0 {
        return Err(EngineError::NotFound(id).into());
    }
    Ok(())
}

/// Apply a partial topic / bias update. Fields set to None keep their stored value.
pub fn update_analysis(conn: &Connection, id: i64, update: &AnalysisUpdate) -> Result<()> {
    let changed = conn.execute(
        "UPDATE articles SET
            topic = COALESCE(?2, topic),
            bias_score = COALESCE(?3, bias_score)
         WHERE id = ?1",
        params![id, update.topic, update.bias_score],
    )?;
    if changed == 0 {
        return Err(EngineError::NotFound(id).into());
    }
    Ok(())
}

/// Aggregate article counts for the status display.
pub fn article_stats(conn: &Connection) -> Result<ArticleStats> {
    let stats = conn.query_row(
        "SELECT COUNT(*), COUNT(sentiment), COUNT(embedding), COUNT(bias_score),
                COUNT(DISTINCT topic), COUNT(DISTINCT source)
         FROM articles",
        [],
        |row| {
            Ok(ArticleStats {
                total: row.get(0)?,
                featured: row.get(1)?,
                embedded: row.get(2)?,
                scored: row.get(3)?,
                topics: row.get(4)?,
                sources: row.get(5)?,
            })
        },
    )?;
    Ok(stats)
}

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    let published: Option<String> = row.get(4)?;
    Ok(Article {
        id: row.get(0)?,
        url: row.get(1)?,
        source: row.get(2)?,
        title: row.get(3)?,
        published: published.as_deref().and_then(parse_timestamp),
        text: row.get(5)?,
        sentiment: row.get(6)?,
        subjectivity: row.get(7)?,
        emotive_score: row.get(8)?,
        embedding: row.get(9)?,
        topic: row.get(10)?,
        bias_score: row.get(11)?,
    })
}

/// Timestamps are stored as UTC RFC 3339 so string order matches time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// --- Run state ---

/// Get a run state value by key (e.g., "last_run_at").
pub fn get_run_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM run_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a run state value (upsert).
pub fn set_run_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO run_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Run lock ---

// Millisecond timestamps, so short stale windows are measured precisely.
const LOCK_NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Try to take the singleton run lock for `owner`.
///
/// A lock older than `stale_after_secs` is treated as abandoned (its holder
/// crashed) and reclaimed. Returns true when `owner` holds the lock afterwards.
pub fn try_acquire_run_lock(conn: &Connection, owner: &str, stale_after_secs: i64) -> Result<bool> {
    conn.execute(
        "DELETE FROM run_lock
         WHERE julianday(acquired_at) <= julianday('now') - ?1 / 86400.0",
        params![stale_after_secs],
    )?;
    conn.execute(
        &format!("INSERT OR IGNORE INTO run_lock (id, owner, acquired_at) VALUES (1, ?1, {LOCK_NOW})"),
        params![owner],
    )?;
    let holder: String =
        conn.query_row("SELECT owner FROM run_lock WHERE id = 1", [], |row| row.get(0))?;
    Ok(holder == owner)
}

/// Re-stamp the run lock held by `owner`. Returns false when the row is gone
/// or belongs to someone else.
pub fn refresh_run_lock(conn: &Connection, owner: &str) -> Result<bool> {
    let updated = conn.execute(
        &format!("UPDATE run_lock SET acquired_at = {LOCK_NOW} WHERE owner = ?1"),
        params![owner],
    )?;
    Ok(updated == 1)
}

/// Release the run lock if `owner` holds it.
pub fn release_run_lock(conn: &Connection, owner: &str) -> Result<()> {
    conn.execute("DELETE FROM run_lock WHERE owner = ?1", params![owner])?;
    Ok(())
}
