//! Sequential cross-segment synthesis.
//!
//! Runs after the fan-out completes, over whatever partial data survived.
//! Unlike segment fetches, a synthesis failure is fatal for the run: there
//! is no cross-source summary to degrade to.

use std::collections::BTreeMap;

use lumina_core::{ProductCategory, Subject};
use serde_json::Value;

use crate::artifacts::ArtifactWriter;
use crate::client::ModelClient;
use crate::error::IngestError;
use crate::prompts;
use crate::repair::repair_json;
use crate::segments::Segment;

/// Character ceiling for the collected-data digest embedded in the synthesis
/// request. Keeps the request inside the model's context window even when
/// the fan-out returned unusually verbose payloads.
const MAX_DIGEST_CHARS: usize = 60_000;

/// Parsed synthesis payload plus the fingerprint of the instruction pair
/// that produced it, kept as provenance for storage.
pub(crate) struct SynthesisOutcome {
    pub payload: Value,
    pub prompt_hash: String,
}

/// Run the synthesis pass over the merged platform data.
///
/// The merged platforms are serialized into a bounded digest together with
/// per-segment platform counts, so the model can weigh how much of each
/// source survived the fan-out.
///
/// # Errors
///
/// Any [`IngestError`] from the model call, or [`IngestError::Unparsable`]
/// with [`Segment::Synthesis`] when no structured payload could be
/// recovered. The raw text is saved as a debug artifact before the error is
/// returned.
pub(crate) async fn synthesize(
    client: &ModelClient,
    artifacts: &ArtifactWriter,
    subject: &Subject,
    category: ProductCategory,
    platforms: &BTreeMap<String, Value>,
    segment_counts: &[(Segment, usize)],
    repair_max_bytes: usize,
) -> Result<SynthesisOutcome, IngestError> {
    let digest = build_digest(platforms, segment_counts);
    let (system, user) = prompts::synthesis_instructions(subject, category, &digest);
    // Fingerprint the system framing only: the user half embeds run data and
    // would make the hash useless as a stable prompt identity.
    let prompt_hash = prompts::prompt_fingerprint(&system, "");

    let raw = client.complete(Segment::Synthesis, &system, &user).await?;

    let Some(parsed) = repair_json(&raw, repair_max_bytes) else {
        artifacts
            .save_raw(&subject.slug(), Segment::Synthesis.as_str(), &raw)
            .await;
        return Err(IngestError::Unparsable {
            segment: Segment::Synthesis,
        });
    };

    Ok(SynthesisOutcome {
        payload: parsed,
        prompt_hash,
    })
}

fn build_digest(platforms: &BTreeMap<String, Value>, segment_counts: &[(Segment, usize)]) -> String {
    let coverage: Vec<String> = segment_counts
        .iter()
        .map(|(segment, count)| format!("{segment}: {count} platforms"))
        .collect();

    let serialized = serde_json::to_string_pretty(platforms)
        .unwrap_or_else(|_| "{}".to_string());
    let body = bounded(&serialized, MAX_DIGEST_CHARS);

    format!("Segment coverage: {}.\n\n{body}", coverage.join(", "))
}

/// Truncate on a char boundary with an explicit marker, so the model sees
/// that the data was cut rather than silently ending mid-object.
fn bounded(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}\n...[data truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_reports_segment_coverage() {
        let mut platforms = BTreeMap::new();
        platforms.insert("amazon".to_string(), json!({"url": "https://amazon.com/x"}));
        let counts = [
            (Segment::Retail, 1),
            (Segment::Editorial, 0),
            (Segment::Influencer, 0),
        ];
        let digest = build_digest(&platforms, &counts);
        assert!(digest.contains("retail: 1 platforms"));
        assert!(digest.contains("editorial: 0 platforms"));
        assert!(digest.contains("https://amazon.com/x"));
    }

    #[test]
    fn bounded_marks_truncation() {
        let long = "x".repeat(100);
        let out = bounded(&long, 10);
        assert!(out.starts_with("xxxxxxxxxx"));
        assert!(out.ends_with("...[data truncated]"));
        assert_eq!(bounded("short", 10), "short");
    }
}
