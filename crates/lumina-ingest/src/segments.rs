//! Segment fetchers: one bounded extraction concern per fan-out unit.

use std::collections::BTreeMap;

use lumina_core::{ProductCategory, Subject};
use serde_json::Value;

use crate::artifacts::ArtifactWriter;
use crate::client::ModelClient;
use crate::error::IngestError;
use crate::prompts;
use crate::repair::repair_json;

/// One independently-fetchable slice of a subject's data.
///
/// `Synthesis` is not a fan-out segment; it labels the sequential
/// cross-segment pass in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Retail,
    Editorial,
    Influencer,
    Synthesis,
}

impl Segment {
    /// The three mutually independent fan-out segments, in dispatch order.
    /// Completion order is not guaranteed to match.
    pub const FAN_OUT: [Segment; 3] = [Segment::Retail, Segment::Editorial, Segment::Influencer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Retail => "retail",
            Segment::Editorial => "editorial",
            Segment::Influencer => "influencer",
            Segment::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial record produced by one segment fetcher call. Ephemeral: lives
/// only until the merge, never persisted directly.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub segment: Segment,
    /// Platform name → raw platform payload, exactly as the model returned
    /// it. Full-schema validation is deferred to the validator.
    pub platforms: BTreeMap<String, Value>,
}

impl SegmentResult {
    /// The degraded form: present but empty, so downstream merge code never
    /// distinguishes "failed" from "found nothing".
    #[must_use]
    pub fn empty(segment: Segment) -> Self {
        Self {
            segment,
            platforms: BTreeMap::new(),
        }
    }
}

/// Fetch one segment's partial record for a subject.
///
/// Builds the segment's instruction pair, dispatches it to the model under
/// the client's call timeout, and pipes the raw text through the repair
/// parser. Does not retry; retry policy belongs to the orchestrator's
/// caller, not this layer.
///
/// # Errors
///
/// - [`IngestError::Transport`] / [`IngestError::Timeout`] /
///   [`IngestError::ModelStatus`] / [`IngestError::EmptyCompletion`] — the
///   model was not usable for this call.
/// - [`IngestError::Unparsable`] — the model responded but no structured
///   payload could be recovered; the raw text is saved as a debug artifact
///   before the error is returned.
pub async fn fetch_segment(
    client: &ModelClient,
    artifacts: &ArtifactWriter,
    segment: Segment,
    subject: &Subject,
    category: ProductCategory,
    repair_max_bytes: usize,
) -> Result<SegmentResult, IngestError> {
    let (system, user) = prompts::segment_instructions(segment, subject, category);
    let raw = client.complete(segment, &system, &user).await?;

    let Some(parsed) = repair_json(&raw, repair_max_bytes) else {
        artifacts.save_raw(&subject.slug(), segment.as_str(), &raw).await;
        return Err(IngestError::Unparsable { segment });
    };

    Ok(SegmentResult {
        segment,
        platforms: extract_platforms(&parsed),
    })
}

/// Pull the `platforms` object out of a parsed segment payload.
///
/// Missing or non-object `platforms` yields an empty map: the segment
/// returned something decodable that simply carries no platform data, which
/// merges as a no-op rather than failing the run.
fn extract_platforms(parsed: &Value) -> BTreeMap<String, Value> {
    parsed
        .get("platforms")
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
