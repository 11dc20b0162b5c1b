//! Ingest command handlers.
//!
//! The model client and pipeline are built once and reused across products;
//! each `ingest_one` call is an independent run. Failures are reported in
//! three distinct classes so operators can tell a flaky gateway from schema
//! drift from a database problem.

use lumina_core::{AppConfig, Subject};
use lumina_db::{ProductRow, Provenance};
use lumina_ingest::{
    ArtifactWriter, IngestError, ModelClient, ModelClientConfig, Pipeline, PipelineConfig,
};
use sqlx::PgPool;

pub(crate) struct Runner {
    pipeline: Pipeline,
}

impl Runner {
    /// Build the shared model client and pipeline from app config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub(crate) fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = ModelClient::new(ModelClientConfig {
            base_url: config.model_base_url.clone(),
            api_key: config.model_api_key.clone(),
            model: config.model_name.clone(),
            max_tokens: config.model_max_tokens,
            temperature: config.model_temperature,
            call_timeout_secs: config.model_call_timeout_secs,
        })?;
        let artifacts = ArtifactWriter::new(config.artifact_dir.clone());
        let pipeline = Pipeline::new(
            client,
            artifacts,
            PipelineConfig {
                ingest_workers: config.ingest_workers,
                repair_max_bytes: config.repair_max_bytes,
            },
        );
        Ok(Self { pipeline })
    }

    /// Aggregate, validate, and store one product.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failed stage: model (gateway unreachable
    /// or synthesis unusable), validation (schema drift survived the
    /// corrective pass), or storage (transaction rolled back).
    pub(crate) async fn ingest_one(
        &self,
        pool: &PgPool,
        config: &AppConfig,
        product: &ProductRow,
    ) -> anyhow::Result<()> {
        let subject = Subject {
            name: product.name.clone(),
            brand: product.brand.clone(),
            description: product.description.clone(),
        };

        let validated = match self.pipeline.aggregate_validated(&subject).await {
            Ok(validated) => validated,
            Err(e @ IngestError::Validation(_)) => {
                anyhow::bail!("validation failed for '{}': {e}", product.slug)
            }
            Err(e) => anyhow::bail!("model stage failed for '{}': {e}", product.slug),
        };
        if !validated.degraded_segments.is_empty() {
            tracing::warn!(
                slug = %product.slug,
                segments = ?validated.degraded_segments,
                "run completed with degraded segments"
            );
        }

        let provenance = Provenance {
            model_name: config.model_name.clone(),
            prompt_hash: validated.prompt_hash.clone(),
        };
        if !lumina_db::store_snapshot(pool, product.id, &validated.snapshot, &provenance).await {
            anyhow::bail!(
                "storage failed for '{}': transaction rolled back",
                product.slug
            );
        }

        tracing::info!(slug = %product.slug, category = %validated.category, "product ingested");
        Ok(())
    }
}
