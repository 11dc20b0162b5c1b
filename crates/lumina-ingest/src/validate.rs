//! Schema validation with corrective degradation.
//!
//! The merged record is checked strictly first. If only bound violations
//! are found, corrective rewrites are applied (truncate, clamp, backfill)
//! and the result is checked once more; violations that survive the rewrite
//! fail the run. Structural problems are never rewritten: an unknown
//! platform key or a record that does not deserialize means schema drift
//! between the model and this consumer, and is a hard error.

use std::collections::BTreeMap;
use std::str::FromStr;

use lumina_core::snapshot::{
    AggregatedSnapshot, EditorialRecord, PlatformEntry, PlatformKey, PlatformKind,
    ProductIdentity, RetailRecord, SocialRecord, Specifications, SummarizedReview,
    MAX_CONS, MAX_EDITORIAL_QUOTES, MAX_PLATFORM_SUMMARY_CHARS, MAX_PROS, MAX_QUOTE_WORDS,
    MAX_REVIEWS_PER_PLATFORM, MAX_REVIEW_BODY_CHARS, MIN_PROS,
};
use serde_json::Value;

use crate::error::ValidationFailure;

/// Appended when a text field is cut to its bound.
const TRUNCATION_MARKER: &str = "…[truncated]";
/// Backfilled when the model reported no pros at all.
const PLACEHOLDER_PRO: &str = "No specific strengths identified";
/// Backfilled when the verdict is missing or blank.
const DEFAULT_VERDICT: &str = "No verdict available";

/// Validate a merged record into an [`AggregatedSnapshot`].
///
/// # Errors
///
/// Returns [`ValidationFailure`] carrying every violation found when the
/// record is structurally broken, or when bound violations survive the
/// corrective rewrite pass.
pub fn validate_snapshot(raw: &Value) -> Result<AggregatedSnapshot, ValidationFailure> {
    let mut snapshot = parse_structure(raw)?;

    let violations = check_bounds(&snapshot);
    if violations.is_empty() {
        return Ok(snapshot);
    }

    tracing::warn!(
        violations = violations.len(),
        first = %violations[0],
        "record exceeds bounds; applying corrective rewrites"
    );
    degrade(&mut snapshot);

    let remaining = check_bounds(&snapshot);
    if remaining.is_empty() {
        Ok(snapshot)
    } else {
        Err(ValidationFailure { reasons: remaining })
    }
}

fn parse_structure(raw: &Value) -> Result<AggregatedSnapshot, ValidationFailure> {
    let mut reasons = Vec::new();

    let product_identity = match raw.get("product_identity") {
        Some(value) => match serde_json::from_value::<ProductIdentity>(value.clone()) {
            Ok(identity) => Some(identity),
            Err(e) => {
                reasons.push(format!("product_identity does not deserialize: {e}"));
                None
            }
        },
        None => {
            reasons.push("missing product_identity".to_string());
            None
        }
    };

    let summarized_review = match raw.get("summarized_review") {
        Some(value) => match serde_json::from_value::<SummarizedReview>(value.clone()) {
            Ok(review) => Some(review),
            Err(e) => {
                reasons.push(format!("summarized_review does not deserialize: {e}"));
                None
            }
        },
        None => {
            reasons.push("missing summarized_review".to_string());
            None
        }
    };

    let specifications = match raw.get("specifications") {
        Some(value) => serde_json::from_value::<Specifications>(value.clone()).unwrap_or_else(|e| {
            reasons.push(format!("specifications does not deserialize: {e}"));
            Specifications::default()
        }),
        None => Specifications::default(),
    };

    let citations = parse_citations(raw.get("citations"));
    let platforms = parse_platforms(raw.get("platforms"), &mut reasons);

    match (product_identity, summarized_review) {
        (Some(product_identity), Some(summarized_review)) if reasons.is_empty() => {
            Ok(AggregatedSnapshot {
                product_identity,
                platforms,
                specifications,
                summarized_review,
                citations,
            })
        }
        _ => Err(ValidationFailure { reasons }),
    }
}

/// Citations are tolerant: non-string values are dropped rather than failing
/// the record, since a stray null here carries no information worth keeping.
fn parse_citations(raw: Option<&Value>) -> BTreeMap<String, String> {
    raw.and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, value)| {
                    value.as_str().map(|url| (key.clone(), url.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_platforms(
    raw: Option<&Value>,
    reasons: &mut Vec<String>,
) -> BTreeMap<PlatformKey, PlatformEntry> {
    let Some(object) = raw.and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    let mut platforms = BTreeMap::new();
    for (name, payload) in object {
        let key = match PlatformKey::from_str(name) {
            Ok(key) => key,
            Err(e) => {
                reasons.push(e);
                continue;
            }
        };
        match parse_entry(key, payload) {
            Ok(entry) => {
                platforms.insert(key, entry);
            }
            Err(e) => {
                reasons.push(format!("platform {name} does not deserialize: {e}"));
            }
        }
    }
    platforms
}

/// Pick the record variant from the key's structural family. The wire shape
/// is not self-describing; the key decides what the payload must look like.
fn parse_entry(key: PlatformKey, payload: &Value) -> Result<PlatformEntry, serde_json::Error> {
    match key.kind() {
        PlatformKind::Retail => {
            serde_json::from_value::<RetailRecord>(payload.clone()).map(PlatformEntry::Retail)
        }
        PlatformKind::Editorial => {
            serde_json::from_value::<EditorialRecord>(payload.clone()).map(PlatformEntry::Editorial)
        }
        PlatformKind::Social => {
            let normalized = normalize_social(payload.clone());
            serde_json::from_value::<SocialRecord>(normalized).map(PlatformEntry::Social)
        }
    }
}

/// Models report engagement counts as numbers as often as strings; coerce
/// to string before the typed parse.
fn normalize_social(mut payload: Value) -> Value {
    if let Some(record) = payload.as_object_mut() {
        for field in ["posts", "reviews"] {
            if let Some(posts) = record.get_mut(field).and_then(Value::as_array_mut) {
                coerce_engagement(posts);
            }
        }
    }
    payload
}

fn coerce_engagement(posts: &mut [Value]) {
    for post in posts {
        let Some(fields) = post.as_object_mut() else {
            continue;
        };
        for field in ["engagement", "views", "likes"] {
            if let Some(value) = fields.get_mut(field) {
                if let Some(n) = value.as_i64() {
                    *value = Value::String(n.to_string());
                } else if let Some(n) = value.as_f64() {
                    *value = Value::String(n.to_string());
                }
            }
        }
    }
}

fn check_bounds(snapshot: &AggregatedSnapshot) -> Vec<String> {
    let mut violations = Vec::new();
    let review = &snapshot.summarized_review;

    if review.pros.len() < MIN_PROS {
        violations.push("pros list is empty".to_string());
    }
    if review.pros.len() > MAX_PROS {
        violations.push(format!("{} pros exceeds the {MAX_PROS} bound", review.pros.len()));
    }
    if review.cons.len() > MAX_CONS {
        violations.push(format!("{} cons exceeds the {MAX_CONS} bound", review.cons.len()));
    }
    if review.verdict.trim().is_empty() {
        violations.push("verdict is blank".to_string());
    }
    for (aspect, score) in &review.aspect_scores {
        if !(0.0..=1.0).contains(score) {
            violations.push(format!("aspect score {aspect}={score} outside [0, 1]"));
        }
    }
    if let Some(insights) = &review.platform_insights {
        for (label, text) in [
            ("retail_consensus", &insights.retail_consensus),
            ("influencer_consensus", &insights.influencer_consensus),
            ("expert_consensus", &insights.expert_consensus),
        ] {
            if let Some(text) = text {
                if char_len(text) > MAX_PLATFORM_SUMMARY_CHARS {
                    violations.push(format!(
                        "{label} exceeds {MAX_PLATFORM_SUMMARY_CHARS} chars"
                    ));
                }
            }
        }
    }

    for (key, entry) in &snapshot.platforms {
        match entry {
            PlatformEntry::Retail(record) => check_retail(*key, record, &mut violations),
            PlatformEntry::Editorial(record) => check_editorial(*key, record, &mut violations),
            PlatformEntry::Social(record) => check_social(*key, record, &mut violations),
        }
    }
    violations
}

fn check_retail(key: PlatformKey, record: &RetailRecord, violations: &mut Vec<String>) {
    if record.reviews.len() > MAX_REVIEWS_PER_PLATFORM {
        violations.push(format!(
            "{key}: {} reviews exceeds the {MAX_REVIEWS_PER_PLATFORM} bound",
            record.reviews.len()
        ));
    }
    for review in &record.reviews {
        if let Some(body) = &review.body {
            if char_len(body) > MAX_REVIEW_BODY_CHARS {
                violations.push(format!("{key}: review body exceeds {MAX_REVIEW_BODY_CHARS} chars"));
            }
        }
        if let Some(rating) = review.rating {
            if !(0.0..=5.0).contains(&rating) {
                violations.push(format!("{key}: review rating {rating} outside [0, 5]"));
            }
        }
    }
    if let Some(rating) = &record.rating {
        if let Some(average) = rating.average {
            if !(0.0..=5.0).contains(&average) {
                violations.push(format!("{key}: rating average {average} outside [0, 5]"));
            }
        }
        if let Some(count) = rating.count {
            if count < 0 {
                violations.push(format!("{key}: rating count {count} is negative"));
            }
        }
    }
    check_summary(key, record.summary.as_deref(), violations);
}

fn check_editorial(key: PlatformKey, record: &EditorialRecord, violations: &mut Vec<String>) {
    if record.quotes.len() > MAX_EDITORIAL_QUOTES {
        violations.push(format!(
            "{key}: {} quotes exceeds the {MAX_EDITORIAL_QUOTES} bound",
            record.quotes.len()
        ));
    }
    for quote in &record.quotes {
        if quote.quote.split_whitespace().count() > MAX_QUOTE_WORDS {
            violations.push(format!("{key}: quote from {} exceeds {MAX_QUOTE_WORDS} words", quote.outlet));
        }
    }
    check_summary(key, record.summary.as_deref(), violations);
}

fn check_social(key: PlatformKey, record: &SocialRecord, violations: &mut Vec<String>) {
    if record.posts.len() > MAX_REVIEWS_PER_PLATFORM {
        violations.push(format!(
            "{key}: {} posts exceeds the {MAX_REVIEWS_PER_PLATFORM} bound",
            record.posts.len()
        ));
    }
    check_summary(key, record.summary.as_deref(), violations);
}

fn check_summary(key: PlatformKey, summary: Option<&str>, violations: &mut Vec<String>) {
    if let Some(summary) = summary {
        if char_len(summary) > MAX_PLATFORM_SUMMARY_CHARS {
            violations.push(format!(
                "{key}: platform summary exceeds {MAX_PLATFORM_SUMMARY_CHARS} chars"
            ));
        }
    }
}

/// Corrective rewrites for bound violations. Every rewrite moves the record
/// toward the bounds; none invents data beyond the two labeled backfills.
fn degrade(snapshot: &mut AggregatedSnapshot) {
    let review = &mut snapshot.summarized_review;

    review.pros.truncate(MAX_PROS);
    if review.pros.is_empty() {
        review.pros.push(PLACEHOLDER_PRO.to_string());
    }
    review.cons.truncate(MAX_CONS);
    if review.verdict.trim().is_empty() {
        review.verdict = DEFAULT_VERDICT.to_string();
    }
    for score in review.aspect_scores.values_mut() {
        *score = score.clamp(0.0, 1.0);
    }
    if let Some(insights) = &mut review.platform_insights {
        for text in [
            &mut insights.retail_consensus,
            &mut insights.influencer_consensus,
            &mut insights.expert_consensus,
        ]
        .into_iter()
        .flatten()
        {
            *text = truncate_text(text, MAX_PLATFORM_SUMMARY_CHARS);
        }
    }

    for entry in snapshot.platforms.values_mut() {
        match entry {
            PlatformEntry::Retail(record) => degrade_retail(record),
            PlatformEntry::Editorial(record) => degrade_editorial(record),
            PlatformEntry::Social(record) => degrade_social(record),
        }
    }
}

fn degrade_retail(record: &mut RetailRecord) {
    record.reviews.truncate(MAX_REVIEWS_PER_PLATFORM);
    for review in &mut record.reviews {
        if let Some(body) = &mut review.body {
            *body = truncate_text(body, MAX_REVIEW_BODY_CHARS);
        }
        if let Some(rating) = &mut review.rating {
            *rating = rating.clamp(0.0, 5.0);
        }
    }
    if let Some(rating) = &mut record.rating {
        if let Some(average) = &mut rating.average {
            *average = average.clamp(0.0, 5.0);
        }
        if let Some(count) = &mut rating.count {
            *count = (*count).max(0);
        }
    }
    if let Some(summary) = &mut record.summary {
        *summary = truncate_text(summary, MAX_PLATFORM_SUMMARY_CHARS);
    }
}

fn degrade_editorial(record: &mut EditorialRecord) {
    record.quotes.truncate(MAX_EDITORIAL_QUOTES);
    for quote in &mut record.quotes {
        quote.quote = truncate_words(&quote.quote, MAX_QUOTE_WORDS);
    }
    if let Some(summary) = &mut record.summary {
        *summary = truncate_text(summary, MAX_PLATFORM_SUMMARY_CHARS);
    }
}

fn degrade_social(record: &mut SocialRecord) {
    record.posts.truncate(MAX_REVIEWS_PER_PLATFORM);
    for post in &mut record.posts {
        if let Some(summary) = &mut post.summary {
            *summary = truncate_text(summary, MAX_PLATFORM_SUMMARY_CHARS);
        }
    }
    if let Some(summary) = &mut record.summary {
        *summary = truncate_text(summary, MAX_PLATFORM_SUMMARY_CHARS);
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cut to at most `max` characters, marker included, so a re-check against
/// the same bound passes.
fn truncate_text(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(char_len(TRUNCATION_MARKER));
    let cut: String = text.chars().take(keep).collect();
    format!("{cut}{TRUNCATION_MARKER}")
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}…", words[..max_words].join(" "))
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
