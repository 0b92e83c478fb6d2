use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::topics::cluster::Linkage;
use crate::topics::{ClusterOptions, DEFAULT_TOPIC_COUNT};

/// Default `list(limit)` window used by every pipeline step.
pub const DEFAULT_ARTICLE_LIMIT: u32 = 2000;

/// Default age after which a store run lock is treated as abandoned.
pub const DEFAULT_LOCK_STALE_SECS: i64 = 3600;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default, so an empty environment is valid.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// Directory containing the ONNX model subdirectories
    pub model_dir: PathBuf,
    /// Requested number of topics per clustering run
    pub topic_count: usize,
    pub linkage: Linkage,
    /// Keep topic numbers stable across runs by nearest-centroid matching
    pub stable_topics: bool,
    pub article_limit: u32,
    pub lock_stale_secs: i64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model_dir = var("SLANT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(crate::nlp::download::default_model_dir);

        let topic_count: usize = parse_var(&var, "SLANT_TOPIC_COUNT", DEFAULT_TOPIC_COUNT)?;
        if topic_count == 0 {
            anyhow::bail!("SLANT_TOPIC_COUNT must be at least 1");
        }

        let linkage = match var("SLANT_LINKAGE") {
            Some(raw) => Linkage::from_str(raw.trim())
                .map_err(|e| anyhow::anyhow!("Invalid SLANT_LINKAGE: {e}"))?,
            None => Linkage::default(),
        };

        let stable_topics = match var("SLANT_STABLE_TOPICS") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("Invalid SLANT_STABLE_TOPICS value '{raw}'"))?,
            None => false,
        };

        let article_limit: u32 = parse_var(&var, "SLANT_ARTICLE_LIMIT", DEFAULT_ARTICLE_LIMIT)?;
        if article_limit == 0 {
            anyhow::bail!("SLANT_ARTICLE_LIMIT must be at least 1");
        }

        let lock_stale_secs: i64 =
            parse_var(&var, "SLANT_RUN_LOCK_STALE_SECS", DEFAULT_LOCK_STALE_SECS)?;
        if lock_stale_secs <= 0 {
            anyhow::bail!("SLANT_RUN_LOCK_STALE_SECS must be positive");
        }

        Ok(Self {
            db_path: var("SLANT_DB_PATH").unwrap_or_else(|| "./slant.db".to_string()),
            model_dir,
            topic_count,
            linkage,
            stable_topics,
            article_limit,
            lock_stale_secs,
        })
    }

    /// Clustering options derived from this configuration.
    pub fn cluster_options(&self) -> ClusterOptions {
        ClusterOptions {
            topic_count: self.topic_count,
            stable_labels: self.stable_topics,
            article_limit: self.article_limit,
        }
    }

    /// Check that both ONNX models are present.
    /// Call this before any operation that computes features.
    pub fn require_models(&self) -> Result<()> {
        if !crate::nlp::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "ONNX model files not found in {}\n\
                 Run `slant download-model` to download them.\n\
                 Or pass --skip-features to cluster and score existing features only.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true/false, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_path, "./slant.db");
        assert_eq!(config.topic_count, 12);
        assert_eq!(config.linkage, Linkage::Average);
        assert!(!config.stable_topics);
        assert_eq!(config.article_limit, 2000);
        assert_eq!(config.lock_stale_secs, 3600);
        assert!(config.model_dir.ends_with("slant/models"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SLANT_DB_PATH", "/data/news.db"),
            ("SLANT_TOPIC_COUNT", "8"),
            ("SLANT_LINKAGE", "ward"),
            ("SLANT_STABLE_TOPICS", "yes"),
            ("SLANT_ARTICLE_LIMIT", "500"),
        ])
        .unwrap();
        assert_eq!(config.db_path, "/data/news.db");
        assert_eq!(config.topic_count, 8);
        assert_eq!(config.linkage, Linkage::Ward);
        assert!(config.stable_topics);
        assert_eq!(config.cluster_options().article_limit, 500);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("SLANT_TOPIC_COUNT", "  ")]).unwrap();
        assert_eq!(config.topic_count, 12);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("SLANT_TOPIC_COUNT", "many")]).unwrap_err();
        assert!(err.to_string().contains("SLANT_TOPIC_COUNT"));

        let err = load(&[("SLANT_LINKAGE", "single")]).unwrap_err();
        assert!(err.to_string().contains("SLANT_LINKAGE"));

        let err = load(&[("SLANT_STABLE_TOPICS", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("SLANT_STABLE_TOPICS"));

        let err = load(&[("SLANT_TOPIC_COUNT", "0")]).unwrap_err();
        assert!(err.to_string().contains("SLANT_TOPIC_COUNT"));
    }

    #[test]
    fn test_require_models_fails_without_files() {
        let config = load(&[("SLANT_MODEL_DIR", "/nonexistent/slant-models")]).unwrap();
        let err = config.require_models().unwrap_err();
        assert!(err.to_string().contains("download-model"));
    }
}
