// Batch pipeline: incremental feature extraction followed by a full
// clustering and bias pass.

pub mod batch;
pub mod features;
pub mod lease;

pub use batch::{Pipeline, PipelineSettings, RunSummary, StepStatus};
