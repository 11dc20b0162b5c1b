//! Debug artifacts for unusable model output.
//!
//! When the repair parser gives up on a payload, the raw text is the only
//! evidence of what the model actually said. Saving it is best-effort: an
//! artifact write never fails a run, it only logs.

use std::path::PathBuf;

use chrono::Utc;

/// Writes raw model output to the artifact directory for post-mortem
/// inspection.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Persist one raw payload under `<slug>-<stage>-<timestamp>.txt`.
    ///
    /// Failures are logged at warn and swallowed; a missing artifact must
    /// never escalate a parse failure into an IO failure.
    pub async fn save_raw(&self, slug: &str, stage: &str, raw: &str) {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let path = self.dir.join(format!("{slug}-{stage}-{timestamp}.txt"));

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to create artifact directory");
            return;
        }
        match tokio::fs::write(&path, raw).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), bytes = raw.len(), "saved raw model output");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to save raw model output");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_raw_writes_file_with_slug_and_stage() {
        let dir = std::env::temp_dir().join(format!("lumina-artifacts-{}", std::process::id()));
        let writer = ArtifactWriter::new(dir.clone());
        writer.save_raw("acme-serum", "retail", "not json at all").await;

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut found = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("acme-serum-retail-") && name.ends_with(".txt") {
                let body = tokio::fs::read_to_string(entry.path()).await.unwrap();
                assert_eq!(body, "not json at all");
                found = true;
            }
        }
        assert!(found, "expected an artifact file in {}", dir.display());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn save_raw_swallows_unwritable_directory() {
        // A path under a file cannot be created as a directory.
        let base = std::env::temp_dir().join(format!("lumina-artifact-file-{}", std::process::id()));
        tokio::fs::write(&base, "occupied").await.unwrap();
        let writer = ArtifactWriter::new(base.join("sub"));
        // Must not panic or error.
        writer.save_raw("slug", "stage", "payload").await;
        tokio::fs::remove_file(&base).await.unwrap();
    }
}
