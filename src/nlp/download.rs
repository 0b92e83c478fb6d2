// Model download helper for the ONNX models.
//
// Downloads two models from HuggingFace:
// 1. DistilBERT SST-2: sentiment classification (~67MB quantized)
// 2. all-MiniLM-L6-v2: sentence embeddings for topic clustering (~90MB)
//
// Files land in a platform data directory (~/.local/share/slant/models/ on
// Linux), one subdirectory per model, each holding model.onnx and
// tokenizer.json.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// A model published on HuggingFace and where it lives locally.
struct ModelSpec {
    label: &'static str,
    subdir: &'static str,
    base_url: &'static str,
    /// Remote path of the ONNX graph, saved locally as model.onnx
    remote_model: &'static str,
    approx_size: &'static str,
}

const SENTIMENT: ModelSpec = ModelSpec {
    label: "Sentiment model (distilbert-sst-2)",
    subdir: "distilbert-sst-2",
    base_url:
        "https://huggingface.co/Xenova/distilbert-base-uncased-finetuned-sst-2-english/resolve/main",
    remote_model: "onnx/model_quantized.onnx",
    approx_size: "~67 MB",
};

const EMBEDDING: ModelSpec = ModelSpec {
    label: "Sentence embedding model (all-MiniLM-L6-v2)",
    subdir: "all-MiniLM-L6-v2",
    base_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main",
    remote_model: "onnx/model.onnx",
    approx_size: "~90 MB",
};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slant")
        .join("models")
}

/// Subdirectory within `base` for the sentiment classifier.
pub fn sentiment_model_dir(base: &Path) -> PathBuf {
    base.join(SENTIMENT.subdir)
}

/// Subdirectory within `base` for the sentence embedder.
pub fn embedding_model_dir(base: &Path) -> PathBuf {
    base.join(EMBEDDING.subdir)
}

fn files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Check whether both models are fully downloaded under `base`.
pub fn model_files_present(base: &Path) -> bool {
    files_present(&sentiment_model_dir(base)) && files_present(&embedding_model_dir(base))
}

/// Download both models, skipping files that already exist.
pub async fn download_models(base: &Path) -> Result<()> {
    let client = reqwest::Client::new();
    for spec in [&SENTIMENT, &EMBEDDING] {
        download_spec(&client, base, spec).await?;
    }
    Ok(())
}

async fn download_spec(client: &reqwest::Client, base: &Path, spec: &ModelSpec) -> Result<()> {
    println!("\n{}:", spec.label);

    let dir = base.join(spec.subdir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!(model = spec.subdir, "Tokenizer already exists, skipping");
        println!("  {} (already exists)", TOKENIZER_FILE);
    } else {
        println!("  Downloading {}...", TOKENIZER_FILE);
        download_file(
            client,
            &format!("{}/{}", spec.base_url, TOKENIZER_FILE),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!(model = spec.subdir, "Model already exists, skipping");
        println!("  {} (already exists)", MODEL_FILE);
    } else {
        println!("  Downloading {} ({})...", MODEL_FILE, spec.approx_size);
        download_file(
            client,
            &format!("{}/{}", spec.base_url, spec.remote_model),
            &model_path,
            true,
        )
        .await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = show_progress.then(|| match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        }
    });

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    // A partial file must never pass model_files_present
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move {} into place", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_slant() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("slant") && path_str.contains("models"),
            "Expected path containing slant/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_subdirectories() {
        let base = PathBuf::from("/tmp/test-models");
        assert_eq!(sentiment_model_dir(&base), base.join("distilbert-sst-2"));
        assert_eq!(embedding_model_dir(&base), base.join("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("slant-test-nonexistent-models");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_requires_both_models() {
        let dir = std::env::temp_dir().join(format!("slant-models-{}", std::process::id()));
        let sentiment = sentiment_model_dir(&dir);
        std::fs::create_dir_all(&sentiment).unwrap();
        std::fs::write(sentiment.join(MODEL_FILE), b"fake").unwrap();
        std::fs::write(sentiment.join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(!model_files_present(&dir));

        let embedding = embedding_model_dir(&dir);
        std::fs::create_dir_all(&embedding).unwrap();
        std::fs::write(embedding.join(MODEL_FILE), b"fake").unwrap();
        std::fs::write(embedding.join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(model_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
