//! Instruction-pair builders for segment and synthesis calls.
//!
//! Each pair is a fixed system framing plus a subject-parameterized user
//! request. The retail segment and the synthesis stage are category-aware:
//! the attribute and aspect vocabulary of the detected [`ProductCategory`]
//! is substituted into the instructions, changing what is asked for without
//! changing the control flow.

use lumina_core::{ProductCategory, Subject};
use sha2::{Digest, Sha256};

use crate::segments::Segment;

/// Fixed framing shared by every call: pure JSON out, no markdown, no prose.
const OUTPUT_CONTRACT: &str = "CRITICAL: Return ONLY one valid JSON object. \
No markdown fences, no explanations, no surrounding prose. \
Use null for missing data instead of omitting fields. \
Generate the COMPLETE JSON structure with all closing braces.";

/// Build the instruction pair for a fan-out segment.
///
/// Calling this with [`Segment::Synthesis`] is a programming error; the
/// synthesis instructions need the partial-record digest and are built by
/// [`synthesis_instructions`].
pub(crate) fn segment_instructions(
    segment: Segment,
    subject: &Subject,
    category: ProductCategory,
) -> (String, String) {
    let product = subject.display_name();
    match segment {
        Segment::Retail => retail_instructions(&product, category),
        Segment::Editorial => editorial_instructions(&product),
        Segment::Influencer => influencer_instructions(&product),
        Segment::Synthesis => {
            debug_assert!(false, "synthesis instructions require a digest");
            retail_instructions(&product, category)
        }
    }
}

fn retail_instructions(product: &str, category: ProductCategory) -> (String, String) {
    let attributes = category
        .spec_attributes()
        .iter()
        .take(4)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    let system = format!(
        "You are a product retail data specialist for {category} products. \
Extract ONLY retail platform data.\n{OUTPUT_CONTRACT}\n\
Return a single object of the form \
{{\"platforms\": {{\"amazon\": {{\"url\", \"price\": {{\"amount\", \"currency\", \
\"unit_price\", \"availability\", \"promo\"}}, \"rating\": {{\"average\", \"count\", \
\"breakdown\"}}, \"reviews\": [{{\"author\", \"rating\", \"title\", \"body\", \"date\", \
\"url\"}}], \"summary\"}}, \"sephora\": ..., \"ulta\": ..., \"walmart\": ..., \
\"nordstrom\": ...}}}}.\n\
Per platform: at most 5 reviews, review body at most 300 characters, \
platform summary at most 150 characters. USD pricing. \
Focus reviews on {category}-relevant aspects such as {attributes}."
    );
    let user = format!(
        "Collect current retail data for: {product}\n\
Platforms to cover: amazon, sephora, ulta, walmart, nordstrom.\n\
For each: exact product page URL, current price and availability, rating \
average and count with star breakdown, the 3-5 most helpful recent reviews, \
and a one-line sentiment summary."
    );
    (system, user)
}

fn editorial_instructions(product: &str) -> (String, String) {
    let system = format!(
        "You are a beauty editorial specialist. Extract brand-site and \
editorial publication data.\n{OUTPUT_CONTRACT}\n\
Return a single object of the form \
{{\"platforms\": {{\"brand_site\": {{\"url\", \"price\", \"rating\", \"reviews\", \
\"summary\"}}, \"editorial\": {{\"quotes\": [{{\"outlet\", \"quote\", \"url\"}}], \
\"summary\"}}}}}}.\n\
At most 3 editorial quotes, each at most 25 words, each with its outlet \
name and source URL."
    );
    let user = format!(
        "Collect brand and editorial data for: {product}\n\
1. The brand's official product page: pricing, claims, descriptions.\n\
2. Editorial coverage from major beauty publications: short quotes with \
outlet names and URLs."
    );
    (system, user)
}

fn influencer_instructions(product: &str) -> (String, String) {
    let system = format!(
        "You are a beauty influencer content specialist. Extract YouTube and \
Instagram coverage.\n{OUTPUT_CONTRACT}\n\
Return a single object of the form \
{{\"platforms\": {{\"youtube\": {{\"reviews\": [{{\"creator\", \"channel\", \"title\", \
\"summary\", \"views\", \"date\", \"url\"}}], \"summary\"}}, \"instagram\": \
{{\"reviews\": [{{\"creator\", \"handle\", \"post_type\", \"summary\", \"likes\", \
\"date\", \"url\"}}], \"summary\"}}}}}}.\n\
3-5 posts per platform from established creators, summaries at most 150 \
characters."
    );
    let user = format!(
        "Collect influencer coverage for: {product}\n\
YouTube: dedicated review videos with creator, channel, title, opinion \
summary, view count, date, URL.\n\
Instagram: posts or reels with creator, handle, post type, opinion summary, \
like count, date, URL.\n\
Finish each platform with a one-line consensus summary."
    );
    (system, user)
}

/// Build the instruction pair for the synthesis pass over all partial
/// records. `digest` is the bounded-size serialization of the partials plus
/// per-segment counts, prepared by the synthesis stage.
pub(crate) fn synthesis_instructions(
    subject: &Subject,
    category: ProductCategory,
    digest: &str,
) -> (String, String) {
    let product = subject.display_name();
    let aspects = category.aspects().join(", ");
    let attributes = category.spec_attributes().join(", ");
    let system = format!(
        "You are a product analyst specializing in {category} products. \
Produce cross-source analysis from the data provided by the user.\n\
{OUTPUT_CONTRACT}\n\
Return a single object with exactly these top-level keys: \
\"product_identity\" {{\"name\", \"brand\", \"category\", \"images\"}}, \
\"specifications\" ({category}-relevant attributes such as {attributes}), \
\"summarized_review\" {{\"master_summary\", \"platform_insights\": \
{{\"retail_consensus\", \"influencer_consensus\", \"expert_consensus\"}}, \
\"pros\", \"cons\", \"aspect_scores\", \"verdict\"}}, \
and \"citations\" (source name to URL).\n\
Report 1-7 pros and 0-7 cons based on actual findings, not a forced count. \
Score only {category}-relevant aspects ({aspects}), each in [0.0, 1.0]."
    );
    let user = format!(
        "Analyze all collected data for {product} ({category}) and generate \
the cross-source summary.\n\nCOLLECTED DATA:\n{digest}\n\n\
Synthesize: product identity, {category}-relevant specifications, balanced \
pros and cons mentioned across sources, aspect scores, a 2-3 sentence \
verdict, and citations mapping each source name to its URL."
    );
    (system, user)
}

/// Hex SHA-256 over the instruction pair, stored as provenance alongside
/// the snapshot so re-ingestions under a changed prompt are distinguishable.
#[must_use]
pub fn prompt_fingerprint(system: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system.as_bytes());
    hasher.update([0u8]);
    hasher.update(user.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
