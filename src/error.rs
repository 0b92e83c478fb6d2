// Engine error taxonomy.
//
// Application plumbing uses anyhow. These variants are the conditions the
// pipeline has to tell apart: per-article failures are reported and skipped,
// per-step failures are logged and the next step still runs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed embedding or feature data. Scoped to the clustering step.
    #[error("malformed feature data for article {article_id}: {reason}")]
    FeatureFormat { article_id: i64, reason: String },

    /// Nothing to work on. Soft: the step is a logged no-op.
    #[error("no input available: {0}")]
    EmptyInput(&'static str),

    /// An update targeted an article id that does not exist.
    #[error("article {0} not found")]
    NotFound(i64),

    /// The NLP collaborator failed to produce one feature for one article.
    #[error("{feature} extraction failed for article {article_id}: {reason}")]
    UpstreamFeature {
        article_id: i64,
        feature: &'static str,
        reason: String,
    },

    /// Another batch run holds the run lock.
    #[error("another pipeline run is already in progress")]
    RunInProgress,

    /// The run lock went stale and another process took it mid-run.
    #[error("run lock was taken over by another process")]
    LockLost,
}

impl EngineError {
    /// True when `err` wraps an `EngineError::NotFound`.
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<EngineError>(), Some(EngineError::NotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_survives_anyhow_wrapping() {
        let err: anyhow::Error = EngineError::NotFound(42).into();
        assert!(EngineError::is_not_found(&err));
        assert_eq!(err.to_string(), "article 42 not found");
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err: anyhow::Error = EngineError::RunInProgress.into();
        assert!(!EngineError::is_not_found(&err));
        let plain = anyhow::anyhow!("disk full");
        assert!(!EngineError::is_not_found(&plain));
    }

    #[test]
    fn test_feature_format_message_names_article() {
        let err = EngineError::FeatureFormat {
            article_id: 7,
            reason: "expected 3 dimensions, found 2".to_string(),
        };
        assert!(err.to_string().contains("article 7"));
    }
}
