// Local ONNX sentiment classifier (DistilBERT fine-tuned on SST-2).
//
// Model: distilbert-base-uncased-finetuned-sst-2-english (quantized ONNX export)
// Output: two logits per text, [NEGATIVE, POSITIVE].

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

/// Longest token sequence DistilBERT accepts.
const MAX_TOKENS: usize = 512;

/// Sentiment classifier backed by a local ONNX session.
///
/// Session and tokenizer sit behind Arc so inference can move to
/// spawn_blocking; ort's `Session::run` needs `&mut`, hence the Mutex.
pub struct SentimentClassifier {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentimentClassifier {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Sentiment model not found: {}\nRun `slant download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Sentiment tokenizer not found: {}\nRun `slant download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!("Failed to load sentiment model from {}", model_path.display())
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load sentiment tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        debug!("Loaded sentiment model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }

    /// Signed sentiment of `text`: +p when POSITIVE wins, -p when NEGATIVE
    /// wins, where p is the winning class probability.
    pub async fn classify(&self, text: &str) -> Result<f64> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || classify_sync(&session, &tokenizer, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

fn classify_sync(session: &Mutex<Session>, tokenizer: &Tokenizer, text: &str) -> Result<f64> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let shape = [1i64, ids.len() as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor =
        Tensor::from_array((shape, mask)).context("Failed to create attention_mask tensor")?;

    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            })
            .context("Sentiment ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract sentiment logits")?;

        data.iter().map(|&x| x as f64).collect::<Vec<f64>>()
    };

    let &[negative, positive] = logits.as_slice() else {
        anyhow::bail!("Expected 2 sentiment logits, got {}", logits.len());
    };
    let value = signed_score(negative, positive);

    debug!(
        sentiment = value,
        text_preview = %crate::output::truncate_chars(text, 50),
        "Classified sentiment"
    );

    Ok(value)
}

/// Softmax over two logits.
fn softmax2(a: f64, b: f64) -> (f64, f64) {
    let max = a.max(b);
    let ea = (a - max).exp();
    let eb = (b - max).exp();
    let sum = ea + eb;
    (ea / sum, eb / sum)
}

/// Map [NEGATIVE, POSITIVE] logits to a signed score in [-1, 1].
fn signed_score(negative_logit: f64, positive_logit: f64) -> f64 {
    let (neg, pos) = softmax2(negative_logit, positive_logit);
    if pos >= neg {
        pos
    } else {
        -neg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        for (a, b) in [(0.0, 0.0), (3.0, -1.0), (-20.0, 40.0)] {
            let (p, q) = softmax2(a, b);
            assert!((p + q - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_signed_score_positive() {
        let s = signed_score(-2.0, 3.0);
        assert!(s > 0.99);
    }

    #[test]
    fn test_signed_score_negative() {
        let s = signed_score(4.0, -1.0);
        assert!(s < -0.99);
    }

    #[test]
    fn test_signed_score_tie_is_half() {
        assert!((signed_score(1.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_load_missing_model_errors() {
        let dir = std::env::temp_dir().join("slant-test-no-sentiment-model");
        let err = SentimentClassifier::load(&dir).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }
}
