// System status display: shows DB stats, model presence, last run.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::ArticleStore;
use crate::pipeline::batch::{LAST_RUN_AT, LAST_RUN_STATUS};

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn ArticleStore>, db_display_path: &str, model_dir: &Path) -> Result<()> {
    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    let stats = store.article_stats().await?;
    println!(
        "Articles: {} total from {} sources",
        stats.total, stats.sources
    );
    println!(
        "  {} with features, {} embedded, {} scored, {} topics",
        stats.featured, stats.embedded, stats.scored, stats.topics
    );
    if stats.total > stats.featured {
        println!(
            "  {} awaiting features. Run `slant run` to process them",
            stats.total - stats.featured
        );
    }

    if crate::nlp::download::model_files_present(model_dir) {
        println!("Models: present ({})", model_dir.display());
    } else {
        println!("Models: missing. Run `slant download-model`");
    }

    match store.get_run_state(LAST_RUN_AT).await? {
        Some(at) => {
            let status = store
                .get_run_state(LAST_RUN_STATUS)
                .await?
                .unwrap_or_else(|| "unknown".to_string());
            println!("Last run: {} ({})", at, status);
        }
        None => println!("Last run: never"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
