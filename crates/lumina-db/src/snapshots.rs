//! Idempotent persistence of one validated snapshot.
//!
//! The whole snapshot lands in a single transaction: offers and ratings are
//! keyed upserts, price history is append-only per day, reviews are
//! replace-all per retailer, specs and summaries are keyed upserts. Running
//! the same snapshot twice leaves the database unchanged apart from
//! `updated_at` timestamps.

use lumina_core::snapshot::{AggregatedSnapshot, EditorialRecord, PlatformKey, RetailRecord};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::sanitize::{clamp, clean_text, normalize_currency, quote_spec_key};
use crate::DbError;

/// Where a stored snapshot came from: which model produced it under which
/// instruction fingerprint.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub model_name: String,
    pub prompt_hash: String,
}

/// Persist one validated snapshot for a product.
///
/// Returns `true` when the transaction committed, `false` when any step
/// failed; the failure is logged and the transaction rolled back, leaving
/// previously stored data intact. Storage failure intentionally does not
/// propagate as an error: the aggregation result still exists and the
/// caller decides whether a dropped write fails its run.
pub async fn store_snapshot(
    pool: &PgPool,
    product_id: Uuid,
    snapshot: &AggregatedSnapshot,
    provenance: &Provenance,
) -> bool {
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!(%product_id, error = %e, "failed to open snapshot transaction");
            return false;
        }
    };

    if let Err(e) = store_all(&mut tx, product_id, snapshot, provenance).await {
        tracing::error!(%product_id, error = %e, "snapshot store failed; rolling back");
        if let Err(e) = tx.rollback().await {
            tracing::error!(%product_id, error = %e, "rollback failed");
        }
        return false;
    }

    match tx.commit().await {
        Ok(()) => {
            tracing::info!(%product_id, platforms = snapshot.platforms.len(), "snapshot stored");
            true
        }
        Err(e) => {
            tracing::error!(%product_id, error = %e, "snapshot commit failed");
            false
        }
    }
}

async fn store_all(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    snapshot: &AggregatedSnapshot,
    provenance: &Provenance,
) -> Result<(), DbError> {
    for (key, record) in snapshot.retail_platforms() {
        store_retail(tx, product_id, key, record).await?;
    }
    if let Some(editorial) = snapshot
        .platforms
        .get(&PlatformKey::Editorial)
        .and_then(|entry| entry.as_editorial())
    {
        store_editorial_quotes(tx, product_id, editorial).await?;
    }
    store_specifications(tx, product_id, snapshot).await?;
    store_summary(tx, product_id, snapshot, provenance).await?;
    Ok(())
}

async fn store_retail(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    key: PlatformKey,
    record: &RetailRecord,
) -> Result<(), DbError> {
    let retailer = key.as_str();
    let price = record.price.clone().unwrap_or_default();
    let amount: Option<Decimal> = price.amount.and_then(|a| Decimal::try_from(a).ok());
    let currency = normalize_currency(price.currency.as_deref());

    sqlx::query(
        "INSERT INTO offers \
             (product_id, retailer, url, price, currency, unit_price, availability, promo) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (product_id, retailer) DO UPDATE SET \
             url          = EXCLUDED.url, \
             price        = EXCLUDED.price, \
             currency     = EXCLUDED.currency, \
             unit_price   = EXCLUDED.unit_price, \
             availability = EXCLUDED.availability, \
             promo        = EXCLUDED.promo, \
             updated_at   = NOW()",
    )
    .bind(product_id)
    .bind(retailer)
    .bind(&record.url)
    .bind(amount)
    .bind(&currency)
    .bind(&price.unit_price)
    .bind(&price.availability)
    .bind(&price.promo)
    .execute(&mut **tx)
    .await?;

    // Append-only daily trail: the first write for a day wins, reruns are
    // no-ops.
    if let Some(amount) = amount {
        sqlx::query(
            "INSERT INTO price_history (product_id, retailer, day, price, currency) \
             VALUES ($1, $2, CURRENT_DATE, $3, $4) \
             ON CONFLICT (product_id, retailer, day) DO NOTHING",
        )
        .bind(product_id)
        .bind(retailer)
        .bind(amount)
        .bind(&currency)
        .execute(&mut **tx)
        .await?;
    }

    if let Some(rating) = &record.rating {
        let average = rating.average.map(|a| clamp(a, 0.0, 5.0));
        let breakdown = rating
            .breakdown
            .as_ref()
            .map(|b| json!(b))
            .unwrap_or(serde_json::Value::Null);
        sqlx::query(
            "INSERT INTO ratings (product_id, retailer, average, review_count, breakdown) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (product_id, retailer) DO UPDATE SET \
                 average      = EXCLUDED.average, \
                 review_count = EXCLUDED.review_count, \
                 breakdown    = EXCLUDED.breakdown, \
                 updated_at   = NOW()",
        )
        .bind(product_id)
        .bind(retailer)
        .bind(average)
        .bind(rating.count)
        .bind(breakdown)
        .execute(&mut **tx)
        .await?;
    }

    store_reviews(tx, product_id, retailer, record).await
}

/// Replace-all semantics: the latest run's snippets are the only ones kept
/// for a retailer.
async fn store_reviews(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    retailer: &str,
    record: &RetailRecord,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM reviews WHERE product_id = $1 AND retailer = $2")
        .bind(product_id)
        .bind(retailer)
        .execute(&mut **tx)
        .await?;

    for (position, review) in record.reviews.iter().enumerate() {
        let position = i32::try_from(position).unwrap_or(i32::MAX);
        sqlx::query(
            "INSERT INTO reviews \
                 (product_id, retailer, position, author, rating, title, body, review_date, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product_id)
        .bind(retailer)
        .bind(position)
        .bind(review.author.as_deref().map(clean_text))
        .bind(review.rating.map(|r| clamp(r, 0.0, 5.0)))
        .bind(review.title.as_deref().map(clean_text))
        .bind(review.body.as_deref().map(clean_text))
        .bind(&review.date)
        .bind(&review.url)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn store_editorial_quotes(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    editorial: &EditorialRecord,
) -> Result<(), DbError> {
    for quote in &editorial.quotes {
        let key = format!("editorial_quote_{}", quote_spec_key(&quote.outlet));
        upsert_spec(
            tx,
            product_id,
            &key,
            &clean_text(&quote.quote),
            "editorial",
        )
        .await?;
    }
    Ok(())
}

async fn store_specifications(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    snapshot: &AggregatedSnapshot,
) -> Result<(), DbError> {
    let specs = &snapshot.specifications;
    if let Some(size) = &specs.size {
        upsert_spec(tx, product_id, "size", &clean_text(size), "synthesis").await?;
    }
    if let Some(form) = &specs.form {
        upsert_spec(tx, product_id, "form", &clean_text(form), "synthesis").await?;
    }
    for (key, value) in &specs.extra {
        let rendered = match value {
            serde_json::Value::String(s) => clean_text(s),
            other => other.to_string(),
        };
        upsert_spec(tx, product_id, key, &rendered, "synthesis").await?;
    }
    Ok(())
}

async fn upsert_spec(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    key: &str,
    value: &str,
    source: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO specs (product_id, key, value, source) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (product_id, key, source) DO UPDATE SET \
             value      = EXCLUDED.value, \
             updated_at = NOW()",
    )
    .bind(product_id)
    .bind(key)
    .bind(value)
    .bind(source)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn store_summary(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    snapshot: &AggregatedSnapshot,
    provenance: &Provenance,
) -> Result<(), DbError> {
    let review = &snapshot.summarized_review;
    let insights = review.platform_insights.clone().unwrap_or_default();

    sqlx::query(
        "INSERT INTO summaries \
             (product_id, master_summary, retail_consensus, influencer_consensus, \
              expert_consensus, pros, cons, aspect_scores, verdict, citations, \
              category, model_name, prompt_hash) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (product_id) DO UPDATE SET \
             master_summary       = EXCLUDED.master_summary, \
             retail_consensus     = EXCLUDED.retail_consensus, \
             influencer_consensus = EXCLUDED.influencer_consensus, \
             expert_consensus     = EXCLUDED.expert_consensus, \
             pros                 = EXCLUDED.pros, \
             cons                 = EXCLUDED.cons, \
             aspect_scores        = EXCLUDED.aspect_scores, \
             verdict              = EXCLUDED.verdict, \
             citations            = EXCLUDED.citations, \
             category             = EXCLUDED.category, \
             model_name           = EXCLUDED.model_name, \
             prompt_hash          = EXCLUDED.prompt_hash, \
             updated_at           = NOW()",
    )
    .bind(product_id)
    .bind(review.master_summary.as_deref().map(clean_text))
    .bind(insights.retail_consensus.as_deref().map(clean_text))
    .bind(insights.influencer_consensus.as_deref().map(clean_text))
    .bind(insights.expert_consensus.as_deref().map(clean_text))
    .bind(json!(review.pros))
    .bind(json!(review.cons))
    .bind(json!(review.aspect_scores))
    .bind(clean_text(&review.verdict))
    .bind(json!(snapshot.citations))
    .bind(&snapshot.product_identity.category)
    .bind(&provenance.model_name)
    .bind(&provenance.prompt_hash)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
