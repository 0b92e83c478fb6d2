// Embedding serialization: comma-delimited decimal floats.
//
// `f64`'s Display impl prints the shortest string that parses back to the
// same value, so encode/decode round-trips exactly.

use thiserror::Error;

/// Separator between vector components in the stored string.
pub const DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("component {index} is not a number: {token:?}")]
    InvalidNumber { index: usize, token: String },
    #[error("component {index} is not finite")]
    NonFinite { index: usize },
}

/// Serialize an embedding vector for storage.
pub fn encode_embedding(embedding: &[f64]) -> String {
    embedding
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Parse a stored embedding.
///
/// An empty (or whitespace-only) string means "no embedding" and yields
/// `Ok(None)`, never a zero vector.
pub fn decode_embedding(raw: &str) -> Result<Option<Vec<f64>>, CodecError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let mut values = Vec::new();
    for (index, token) in raw.split(DELIMITER).enumerate() {
        let token = token.trim();
        let value: f64 = token.parse().map_err(|_| CodecError::InvalidNumber {
            index,
            token: token.to_string(),
        })?;
        if !value.is_finite() {
            return Err(CodecError::NonFinite { index });
        }
        values.push(value);
    }
    Ok(Some(values))
}
