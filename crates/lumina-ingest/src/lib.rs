//! Multi-stage extraction pipeline.
//!
//! Fans out independent segment fetchers against a hosted chat-completion
//! model, repairs and merges their partial outputs, runs a sequential
//! synthesis pass over the union, and validates the merged record into an
//! [`lumina_core::AggregatedSnapshot`] ready for storage.

mod artifacts;
mod client;
mod error;
mod pipeline;
mod prompts;
mod repair;
mod segments;
mod synthesis;
mod validate;

pub use artifacts::ArtifactWriter;
pub use client::{ModelClient, ModelClientConfig};
pub use error::{IngestError, ValidationFailure};
pub use pipeline::{Pipeline, PipelineConfig, RawSnapshot, ValidatedSnapshot};
pub use prompts::prompt_fingerprint;
pub use repair::repair_json;
pub use segments::Segment;
pub use validate::validate_snapshot;
