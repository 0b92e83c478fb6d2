// Slant: relative sentiment bias across news sources
//
// This is the library root. Each module corresponds to a major subsystem
// of the batch pipeline.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod nlp;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod status;
pub mod topics;
