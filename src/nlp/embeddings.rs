// Sentence embeddings with all-MiniLM-L6-v2 for topic clustering.
//
// Each article becomes a 384-dimensional vector; articles about the same
// story land close together in Euclidean space. Vectors are mean-pooled
// over tokens and L2-normalized, so Euclidean distance ranks pairs the same
// way cosine similarity does.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// MiniLM was trained on sequences of up to 256 word pieces.
const MAX_TOKENS: usize = 256;

/// Sentence embedder using a local ONNX model.
pub struct SentenceEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentenceEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `slant download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `slant download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }

    /// Embed one text into a unit-length 384-dimensional vector.
    ///
    /// CPU-bound work is offloaded to spawn_blocking to keep the async
    /// runtime responsive.
    pub async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Tokenize, run inference, mean-pool and normalize.
fn embed_sync(session: &Mutex<Session>, tokenizer: &Tokenizer, text: &str) -> Result<Vec<f64>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encoding.get_ids().len();
    if seq_len == 0 {
        anyhow::bail!("Text produced no tokens");
    }

    // BERT inputs: token ids, attention mask, and all-zero token types for
    // single-sentence input.
    let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let token_type_ids = vec![0i64; seq_len];

    let shape = [1i64, seq_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
        .context("Failed to create token_type_ids tensor")?;

    // last_hidden_state: [1, seq_len, 384]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    if hidden_states.len() != seq_len * EMBEDDING_DIM {
        anyhow::bail!(
            "Unexpected embedding output size {} for {} tokens",
            hidden_states.len(),
            seq_len
        );
    }

    let mut pooled = mean_pool(&hidden_states, &attention_mask, EMBEDDING_DIM);
    l2_normalize(&mut pooled);

    debug!(dim = EMBEDDING_DIM, tokens = seq_len, "Computed sentence embedding");

    Ok(pooled)
}

/// Average token vectors weighted by the attention mask.
///
/// `hidden` is row-major `[tokens, dim]`.
pub fn mean_pool(hidden: &[f32], mask: &[i64], dim: usize) -> Vec<f64> {
    let mut sum = vec![0.0_f64; dim];
    let mut mask_sum = 0.0_f64;

    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let weight = m as f64;
        mask_sum += weight;
        let row = &hidden[j * dim..(j + 1) * dim];
        for (acc, &value) in sum.iter_mut().zip(row) {
            *acc += value as f64 * weight;
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }
    sum
}

/// Scale `v` to unit length. A zero vector is left as is.
pub fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // Two tokens of dim 2, second is padding
        let hidden = [1.0_f32, 3.0, 100.0, 100.0];
        let pooled = mean_pool(&hidden, &[1, 0], 2);
        assert_eq!(pooled, vec![1.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_averages_tokens() {
        let hidden = [1.0_f32, 0.0, 3.0, 2.0];
        let pooled = mean_pool(&hidden, &[1, 1], 2);
        assert_eq!(pooled, vec![2.0, 1.0]);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0; 3];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 3]);
    }

    #[test]
    fn test_load_missing_model_errors() {
        let dir = std::env::temp_dir().join("slant-test-no-embedding-model");
        assert!(SentenceEmbedder::load(&dir).is_err());
    }
}
