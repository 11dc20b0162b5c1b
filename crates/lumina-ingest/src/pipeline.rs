//! Orchestrator: fan-out, merge, synthesis.
//!
//! The fan-out runs the three independent segment fetchers concurrently
//! under a bounded worker budget. A failed segment degrades to an empty
//! partial and the run continues; only the synthesis pass is fatal. Merge
//! order is fixed by segment dispatch order, not completion order, so runs
//! are deterministic for a given set of model responses.

use std::collections::BTreeMap;
use std::sync::Arc;

use lumina_core::{detect_category, AggregatedSnapshot, ProductCategory, Subject};
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::artifacts::ArtifactWriter;
use crate::client::ModelClient;
use crate::error::IngestError;
use crate::segments::{fetch_segment, Segment, SegmentResult};
use crate::synthesis;
use crate::validate;

/// Orchestration knobs, sourced from app config.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrent segment-fetch budget. The fan-out has three segments, so
    /// values above 3 buy nothing for a single subject.
    pub ingest_workers: usize,
    /// Byte cap handed to the repair parser.
    pub repair_max_bytes: usize,
}

/// Merged but not-yet-validated output of one pipeline run.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    /// The synthesis payload with the merged `platforms` object installed
    /// over whatever the synthesis pass emitted for that key.
    pub merged: Value,
    pub category: ProductCategory,
    /// Segments that failed and were degraded to empty partials, in
    /// dispatch order. Empty on a clean run.
    pub degraded_segments: Vec<Segment>,
    /// Fingerprint of the synthesis framing, stored as provenance.
    pub prompt_hash: String,
}

/// A run that passed schema validation, ready for storage.
#[derive(Debug, Clone)]
pub struct ValidatedSnapshot {
    pub snapshot: AggregatedSnapshot,
    pub category: ProductCategory,
    pub degraded_segments: Vec<Segment>,
    pub prompt_hash: String,
}

/// Multi-stage extraction pipeline over a shared model client.
///
/// Constructed once and reused across subjects; each [`Pipeline::aggregate`]
/// call is an independent run.
pub struct Pipeline {
    client: Arc<ModelClient>,
    artifacts: ArtifactWriter,
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: ModelClient, artifacts: ArtifactWriter, config: PipelineConfig) -> Self {
        Self {
            client: Arc::new(client),
            artifacts,
            config,
        }
    }

    /// Run the full fan-out → merge → synthesis sequence for one subject.
    ///
    /// Segment failures degrade: the failed segment contributes an empty
    /// partial, the failure is logged, and the run continues with whatever
    /// the other segments produced. Even all three segments failing still
    /// reaches synthesis, which then works from an empty digest.
    ///
    /// # Errors
    ///
    /// Only synthesis-stage errors propagate: any [`IngestError`] from the
    /// synthesis model call, or [`IngestError::Unparsable`] when its output
    /// could not be recovered.
    pub async fn aggregate(&self, subject: &Subject) -> Result<RawSnapshot, IngestError> {
        let category = detect_category(
            &subject.name,
            subject.brand.as_deref(),
            subject.description.as_deref(),
        );
        tracing::info!(
            subject = %subject.display_name(),
            %category,
            workers = self.config.ingest_workers,
            "starting aggregation run"
        );

        let (results, degraded_segments) = self.fan_out(subject, category).await;

        let mut segment_counts = Vec::with_capacity(Segment::FAN_OUT.len());
        let mut platforms: BTreeMap<String, Value> = BTreeMap::new();
        // Dispatch order, not completion order: later segments win key
        // collisions deterministically.
        for segment in Segment::FAN_OUT {
            let result = &results[segment.as_str()];
            segment_counts.push((segment, result.platforms.len()));
            platforms.extend(result.platforms.clone());
        }

        let outcome = synthesis::synthesize(
            &self.client,
            &self.artifacts,
            subject,
            category,
            &platforms,
            &segment_counts,
            self.config.repair_max_bytes,
        )
        .await?;

        let merged = install_platforms(outcome.payload, platforms);

        tracing::info!(
            subject = %subject.display_name(),
            degraded = degraded_segments.len(),
            "aggregation run complete"
        );
        Ok(RawSnapshot {
            merged,
            category,
            degraded_segments,
            prompt_hash: outcome.prompt_hash,
        })
    }

    /// Run the full sequence and validate the merged record.
    ///
    /// # Errors
    ///
    /// Synthesis-stage errors as for [`Pipeline::aggregate`], plus
    /// [`IngestError::Validation`] when the record fails schema validation
    /// after corrective rewrites.
    pub async fn aggregate_validated(
        &self,
        subject: &Subject,
    ) -> Result<ValidatedSnapshot, IngestError> {
        let raw = self.aggregate(subject).await?;
        let snapshot =
            validate::validate_snapshot(&raw.merged).map_err(IngestError::Validation)?;
        Ok(ValidatedSnapshot {
            snapshot,
            category: raw.category,
            degraded_segments: raw.degraded_segments,
            prompt_hash: raw.prompt_hash,
        })
    }

    /// Run all fan-out segments under the worker budget, degrading failures
    /// to empty partials. Returns results keyed by segment name plus the
    /// list of degraded segments in dispatch order.
    async fn fan_out(
        &self,
        subject: &Subject,
        category: ProductCategory,
    ) -> (BTreeMap<String, SegmentResult>, Vec<Segment>) {
        let semaphore = Arc::new(Semaphore::new(self.config.ingest_workers.max(1)));
        let mut tasks = JoinSet::new();

        for segment in Segment::FAN_OUT {
            let client = Arc::clone(&self.client);
            let artifacts = self.artifacts.clone();
            let subject = subject.clone();
            let semaphore = Arc::clone(&semaphore);
            let repair_max_bytes = self.config.repair_max_bytes;

            tasks.spawn(async move {
                // Closed semaphore is unreachable; treat it as an empty permit.
                let _permit = semaphore.acquire().await;
                let outcome = fetch_segment(
                    &client,
                    &artifacts,
                    segment,
                    &subject,
                    category,
                    repair_max_bytes,
                )
                .await;
                (segment, outcome)
            });
        }

        let mut results: BTreeMap<String, SegmentResult> = BTreeMap::new();
        let mut degraded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (segment, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = %e, "segment task panicked; degrading");
                    continue;
                }
            };
            match outcome {
                Ok(result) => {
                    tracing::debug!(%segment, platforms = result.platforms.len(), "segment complete");
                    results.insert(segment.as_str().to_string(), result);
                }
                Err(e) => {
                    tracing::warn!(%segment, error = %e, "segment failed; continuing with empty partial");
                    degraded.push(segment);
                }
            }
        }

        // Panicked or failed segments still need an entry for the merge.
        for segment in Segment::FAN_OUT {
            results
                .entry(segment.as_str().to_string())
                .or_insert_with(|| SegmentResult::empty(segment));
        }
        degraded.sort_by_key(|segment| {
            Segment::FAN_OUT
                .iter()
                .position(|s| s == segment)
                .unwrap_or(usize::MAX)
        });
        (results, degraded)
    }
}

/// Install the merged fan-out platforms over the synthesis payload. The
/// fan-out data is authoritative for `platforms`; the synthesis pass only
/// contributes the cross-source keys.
fn install_platforms(synthesized: Value, platforms: BTreeMap<String, Value>) -> Value {
    let mut object = match synthesized {
        Value::Object(map) => map,
        // repair_json only yields objects, but stay total.
        other => {
            let mut map = Map::new();
            map.insert("synthesis".to_string(), other);
            map
        }
    };
    let platform_map: Map<String, Value> = platforms.into_iter().collect();
    object.insert("platforms".to_string(), Value::Object(platform_map));
    Value::Object(object)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
