// Article ingestion from JSON Lines.
//
// One JSON object per line: {"url", "source", "title"?, "published"?, "text"}.
// `published` is RFC 3339. Articles are deduplicated by URL, so re-ingesting
// the same export is harmless. Bad lines are logged and counted, never fatal.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::models::NewArticle;
use crate::db::ArticleStore;

/// Counts from one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Parse and validate one JSONL record.
pub fn parse_line(line: &str) -> Result<NewArticle> {
    let mut article: NewArticle =
        serde_json::from_str(line).context("Line is not a valid article record")?;

    article.url = article.url.trim().to_string();
    article.source = article.source.trim().to_string();
    article.title = article.title.trim().to_string();

    if article.url.is_empty() {
        anyhow::bail!("Article has an empty url");
    }
    if article.source.is_empty() {
        anyhow::bail!("Article {} has an empty source", article.url);
    }
    if article.text.trim().is_empty() {
        anyhow::bail!("Article {} has no text", article.url);
    }
    Ok(article)
}

/// Ingest every line of `reader` into `store`.
pub async fn ingest_reader<R: BufRead>(store: &dyn ArticleStore, reader: R) -> Result<IngestOutcome> {
    let mut outcome = IngestOutcome::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let article = match parse_line(&line) {
            Ok(article) => article,
            Err(e) => {
                warn!(line = index + 1, error = %format!("{e:#}"), "Skipping invalid record");
                outcome.invalid += 1;
                continue;
            }
        };

        if store.insert_article(&article).await? {
            outcome.inserted += 1;
        } else {
            debug!(url = %article.url, "Article already stored");
            outcome.duplicates += 1;
        }
    }

    Ok(outcome)
}

/// Ingest a JSONL file from disk.
pub async fn ingest_file(store: &dyn ArticleStore, path: &Path) -> Result<IngestOutcome> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    ingest_reader(store, std::io::BufReader::new(file)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_record() {
        let a = parse_line(r#"{"url":" https://a.example/1 ","source":"Herald","text":"Body"}"#)
            .unwrap();
        assert_eq!(a.url, "https://a.example/1");
        assert_eq!(a.title, "");
        assert!(a.published.is_none());
    }

    #[test]
    fn test_parse_published_timestamp() {
        let a = parse_line(
            r#"{"url":"u","source":"s","text":"t","published":"2024-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            a.published.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_line(r#"{"url":"u","text":"t"}"#).is_err());
        assert!(parse_line(r#"{"url":"","source":"s","text":"t"}"#).is_err());
        assert!(parse_line(r#"{"url":"u","source":"s","text":"   "}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[tokio::test]
    async fn test_ingest_counts() {
        let store = crate::db::open_in_memory().unwrap();
        let input = [
            r#"{"url":"https://a.example/1","source":"Herald","text":"One"}"#,
            "",
            r#"{"url":"https://a.example/2","source":"Courier","text":"Two"}"#,
            r#"{"url":"https://a.example/1","source":"Herald","text":"One again"}"#,
            "{broken",
        ]
        .join("\n");

        let outcome = ingest_reader(store.as_ref(), input.as_bytes()).await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome {
                inserted: 2,
                duplicates: 1,
                invalid: 1
            }
        );
        assert_eq!(store.article_stats().await.unwrap().total, 2);
    }
}
