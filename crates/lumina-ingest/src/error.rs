use thiserror::Error;

use crate::segments::Segment;

/// Reasons a merged record failed schema validation after corrective
/// rewrites. Carried by [`IngestError::Validation`] so callers can surface
/// every violation at once rather than the first.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub reasons: Vec<String>,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reasons.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or TLS failure reaching the model gateway. Segment-local:
    /// the orchestrator degrades the segment to an empty partial.
    #[error("transport failure for {segment} segment: {source}")]
    Transport {
        segment: Segment,
        #[source]
        source: reqwest::Error,
    },

    /// The per-call deadline elapsed. Not retried within this layer.
    #[error("{segment} segment timed out after {secs}s")]
    Timeout { segment: Segment, secs: u64 },

    /// Non-2xx status from the model gateway.
    #[error("model gateway returned HTTP {status} for {segment} segment")]
    ModelStatus { segment: Segment, status: u16 },

    /// 2xx response with no usable completion content.
    #[error("model returned an empty completion for {segment} segment")]
    EmptyCompletion { segment: Segment },

    /// The repair parser exhausted all strategies on the model's output.
    /// Distinct from transport failure for observability: the model was
    /// reached but its output was unusable.
    #[error("unparsable model output for {segment} segment")]
    Unparsable { segment: Segment },

    /// The merged record failed schema validation after corrective rewrites.
    /// Run-fatal.
    #[error("snapshot validation failed: {0}")]
    Validation(ValidationFailure),
}

impl IngestError {
    /// Whether this failure is local to one fan-out segment (degrade and
    /// continue) as opposed to fatal for the whole run.
    #[must_use]
    pub fn is_segment_local(&self) -> bool {
        match self {
            IngestError::Transport { segment, .. }
            | IngestError::Timeout { segment, .. }
            | IngestError::ModelStatus { segment, .. }
            | IngestError::EmptyCompletion { segment }
            | IngestError::Unparsable { segment } => *segment != Segment::Synthesis,
            IngestError::Validation(_) => false,
        }
    }
}
