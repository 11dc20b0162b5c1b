//! Domain model for one aggregated product snapshot.
//!
//! A snapshot is assembled fresh per aggregation run, validated once by
//! `lumina-ingest`, then flattened into storage rows by `lumina-db`. It is
//! never mutated after validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum review snippets retained per platform.
pub const MAX_REVIEWS_PER_PLATFORM: usize = 5;
/// Maximum review body length in characters.
pub const MAX_REVIEW_BODY_CHARS: usize = 300;
/// Maximum per-platform sentiment summary length in characters.
pub const MAX_PLATFORM_SUMMARY_CHARS: usize = 150;
/// Maximum editorial quotes retained.
pub const MAX_EDITORIAL_QUOTES: usize = 3;
/// Maximum editorial quote length in words.
pub const MAX_QUOTE_WORDS: usize = 25;
/// Pros cardinality bounds. The flexible 1–7 policy is canonical; the
/// degrader truncates beyond the upper bound and backfills a placeholder
/// below the lower bound.
pub const MIN_PROS: usize = 1;
pub const MAX_PROS: usize = 7;
/// Cons may legitimately be empty.
pub const MAX_CONS: usize = 7;

/// The closed set of platform names a snapshot may carry.
///
/// Any key outside this set is a hard validation error: it indicates schema
/// drift between the model and this consumer, not recoverable noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKey {
    Amazon,
    Sephora,
    Ulta,
    Walmart,
    Nordstrom,
    BrandSite,
    Editorial,
    Youtube,
    Instagram,
}

/// Structural family of a platform entry. Fixed per key; drives which
/// [`PlatformEntry`] variant the validator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Retail,
    Editorial,
    Social,
}

impl PlatformKey {
    pub const ALL: [PlatformKey; 9] = [
        PlatformKey::Amazon,
        PlatformKey::Sephora,
        PlatformKey::Ulta,
        PlatformKey::Walmart,
        PlatformKey::Nordstrom,
        PlatformKey::BrandSite,
        PlatformKey::Editorial,
        PlatformKey::Youtube,
        PlatformKey::Instagram,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKey::Amazon => "amazon",
            PlatformKey::Sephora => "sephora",
            PlatformKey::Ulta => "ulta",
            PlatformKey::Walmart => "walmart",
            PlatformKey::Nordstrom => "nordstrom",
            PlatformKey::BrandSite => "brand_site",
            PlatformKey::Editorial => "editorial",
            PlatformKey::Youtube => "youtube",
            PlatformKey::Instagram => "instagram",
        }
    }

    #[must_use]
    pub fn kind(self) -> PlatformKind {
        match self {
            PlatformKey::Amazon
            | PlatformKey::Sephora
            | PlatformKey::Ulta
            | PlatformKey::Walmart
            | PlatformKey::Nordstrom
            | PlatformKey::BrandSite => PlatformKind::Retail,
            PlatformKey::Editorial => PlatformKind::Editorial,
            PlatformKey::Youtube | PlatformKey::Instagram => PlatformKind::Social,
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown platform key: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIdentity {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub promo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Average rating; clamped to `[0, 5]` by the validator.
    #[serde(default)]
    pub average: Option<f64>,
    /// Review count; non-negative after validation.
    #[serde(default)]
    pub count: Option<i64>,
    /// Star-bucket breakdown keyed by star label (`"5"` .. `"1"`).
    #[serde(default)]
    pub breakdown: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReviewSnippet {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Review body, at most [`MAX_REVIEW_BODY_CHARS`] characters.
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Per-retailer data: current offer, rating aggregate, and review snippets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetailRecord {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub reviews: Vec<ReviewSnippet>,
    /// Model-written sentiment summary for this platform, ≤150 chars.
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorialQuote {
    pub outlet: String,
    /// At most [`MAX_QUOTE_WORDS`] words.
    pub quote: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorialRecord {
    #[serde(default)]
    pub quotes: Vec<EditorialQuote>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// One influencer post or video mention.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub creator: Option<String>,
    /// Channel name (YouTube) or handle (Instagram).
    #[serde(default, alias = "channel", alias = "handle")]
    pub account: Option<String>,
    /// Video title (YouTube) or post type (Instagram).
    #[serde(default, alias = "title", alias = "post_type")]
    pub label: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// View or like count as reported by the source, free-form.
    #[serde(default, alias = "views", alias = "likes")]
    pub engagement: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialRecord {
    #[serde(default, alias = "reviews")]
    pub posts: Vec<SocialPost>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// One platform's contribution to the snapshot.
///
/// The variant is not self-describing in the wire JSON; the validator picks
/// it from [`PlatformKey::kind`]. Serialization is untagged so the stored
/// shape matches what the model produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlatformEntry {
    Retail(RetailRecord),
    Editorial(EditorialRecord),
    Social(SocialRecord),
}

impl PlatformEntry {
    #[must_use]
    pub fn as_retail(&self) -> Option<&RetailRecord> {
        match self {
            PlatformEntry::Retail(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_editorial(&self) -> Option<&EditorialRecord> {
        match self {
            PlatformEntry::Editorial(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Specifications {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    /// Category-specific attributes the synthesis stage chose to report
    /// (e.g. `finish_texture`, `fragrance_notes`). Values are kept as raw
    /// JSON; the store serializes them per key.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlatformInsights {
    #[serde(default)]
    pub retail_consensus: Option<String>,
    #[serde(default)]
    pub influencer_consensus: Option<String>,
    #[serde(default)]
    pub expert_consensus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedReview {
    #[serde(default)]
    pub master_summary: Option<String>,
    #[serde(default)]
    pub platform_insights: Option<PlatformInsights>,
    /// 1–7 entries after validation. Absent on the wire deserializes empty
    /// so the corrective pass can backfill instead of failing the run.
    #[serde(default)]
    pub pros: Vec<String>,
    /// 0–7 entries after validation.
    #[serde(default)]
    pub cons: Vec<String>,
    /// Free-form aspect names scored in `[0, 1]`.
    #[serde(default)]
    pub aspect_scores: BTreeMap<String, f64>,
    /// Non-blank after validation; absent on the wire deserializes empty
    /// and is defaulted by the corrective pass.
    #[serde(default)]
    pub verdict: String,
}

/// Root of one validated aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSnapshot {
    pub product_identity: ProductIdentity,
    pub platforms: BTreeMap<PlatformKey, PlatformEntry>,
    pub specifications: Specifications,
    pub summarized_review: SummarizedReview,
    /// Source label → URL.
    pub citations: BTreeMap<String, String>,
}

impl AggregatedSnapshot {
    /// Iterate retail-kind platform entries as `(key, record)` pairs.
    pub fn retail_platforms(&self) -> impl Iterator<Item = (PlatformKey, &RetailRecord)> {
        self.platforms
            .iter()
            .filter_map(|(key, entry)| entry.as_retail().map(|record| (*key, record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_key_round_trips_through_str() {
        for key in PlatformKey::ALL {
            assert_eq!(key.as_str().parse::<PlatformKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_platform_key_is_rejected() {
        assert!("tiktok".parse::<PlatformKey>().is_err());
    }

    #[test]
    fn platform_kinds_partition_the_key_set() {
        let retail = PlatformKey::ALL
            .iter()
            .filter(|k| k.kind() == PlatformKind::Retail)
            .count();
        let editorial = PlatformKey::ALL
            .iter()
            .filter(|k| k.kind() == PlatformKind::Editorial)
            .count();
        let social = PlatformKey::ALL
            .iter()
            .filter(|k| k.kind() == PlatformKind::Social)
            .count();
        assert_eq!((retail, editorial, social), (6, 1, 2));
    }

    #[test]
    fn social_post_accepts_youtube_field_aliases() {
        let post: SocialPost = serde_json::from_str(
            r#"{"creator": "Ave", "channel": "AveReviews", "title": "Serum test", "views": "1.2M"}"#,
        )
        .unwrap();
        assert_eq!(post.account.as_deref(), Some("AveReviews"));
        assert_eq!(post.label.as_deref(), Some("Serum test"));
        assert_eq!(post.engagement.as_deref(), Some("1.2M"));
    }

    #[test]
    fn specifications_keep_unknown_attributes() {
        let specs: Specifications = serde_json::from_str(
            r#"{"size": "30ml", "finish_texture": "matte", "skin_types": ["oily"]}"#,
        )
        .unwrap();
        assert_eq!(specs.size.as_deref(), Some("30ml"));
        assert!(specs.extra.contains_key("finish_texture"));
        assert!(specs.extra.contains_key("skin_types"));
    }
}
