use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::client::ModelClientConfig;

fn test_pipeline(server_uri: String) -> Pipeline {
    let client = ModelClient::new(ModelClientConfig {
        base_url: server_uri,
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        max_tokens: 256,
        temperature: 0.1,
        call_timeout_secs: 5,
    })
    .unwrap();
    let artifacts = ArtifactWriter::new(std::env::temp_dir().join("lumina-pipeline-tests"));
    Pipeline::new(
        client,
        artifacts,
        PipelineConfig {
            ingest_workers: 3,
            repair_max_bytes: 300_000,
        },
    )
}

fn subject() -> Subject {
    Subject {
        name: "Velvet Matte Lipstick".to_string(),
        brand: Some("AcmeCo".to_string()),
        description: None,
    }
}

fn completion(content: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
    }))
}

/// Mount segment responses keyed on distinctive phrases in each request.
async fn mount_segments(
    server: &MockServer,
    retail: ResponseTemplate,
    editorial: ResponseTemplate,
    influencer: ResponseTemplate,
    synthesis: ResponseTemplate,
) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Collect current retail data"))
        .respond_with(retail)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Collect brand and editorial data"))
        .respond_with(editorial)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Collect influencer coverage"))
        .respond_with(influencer)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("COLLECTED DATA"))
        .respond_with(synthesis)
        .mount(server)
        .await;
}

fn synthesis_payload() -> serde_json::Value {
    json!({
        "product_identity": {"name": "Velvet Matte Lipstick", "brand": "AcmeCo"},
        "specifications": {"finish": "matte"},
        "summarized_review": {
            "master_summary": "Well liked across sources.",
            "pros": ["long wearing"],
            "cons": [],
            "verdict": "Recommended."
        },
        "citations": {"Amazon": "https://amazon.com/x"}
    })
}

#[tokio::test]
async fn clean_run_merges_all_segments_and_synthesis() {
    let server = MockServer::start().await;
    mount_segments(
        &server,
        completion(json!({"platforms": {"amazon": {"url": "https://amazon.com/x"}}})),
        completion(json!({"platforms": {"editorial": {"quotes": []}}})),
        completion(json!({"platforms": {"youtube": {"reviews": []}}})),
        completion(synthesis_payload()),
    )
    .await;

    let snapshot = test_pipeline(server.uri())
        .aggregate(&subject())
        .await
        .unwrap();

    assert!(snapshot.degraded_segments.is_empty());
    assert_eq!(snapshot.category, ProductCategory::Makeup);
    let platforms = snapshot.merged["platforms"].as_object().unwrap();
    assert!(platforms.contains_key("amazon"));
    assert!(platforms.contains_key("editorial"));
    assert!(platforms.contains_key("youtube"));
    assert_eq!(
        snapshot.merged["summarized_review"]["verdict"],
        "Recommended."
    );
    assert_eq!(snapshot.prompt_hash.len(), 64);
}

#[tokio::test]
async fn failed_segment_degrades_instead_of_aborting() {
    let server = MockServer::start().await;
    mount_segments(
        &server,
        completion(json!({"platforms": {"amazon": {"url": "https://amazon.com/x"}}})),
        ResponseTemplate::new(500),
        completion(json!({"platforms": {"youtube": {"reviews": []}}})),
        completion(synthesis_payload()),
    )
    .await;

    let snapshot = test_pipeline(server.uri())
        .aggregate(&subject())
        .await
        .unwrap();

    assert_eq!(snapshot.degraded_segments, vec![Segment::Editorial]);
    let platforms = snapshot.merged["platforms"].as_object().unwrap();
    assert!(platforms.contains_key("amazon"));
    assert!(platforms.contains_key("youtube"));
    assert!(!platforms.contains_key("editorial"));
}

#[tokio::test]
async fn all_segments_failing_still_reaches_synthesis() {
    let server = MockServer::start().await;
    mount_segments(
        &server,
        ResponseTemplate::new(500),
        ResponseTemplate::new(500),
        ResponseTemplate::new(500),
        completion(synthesis_payload()),
    )
    .await;

    let snapshot = test_pipeline(server.uri())
        .aggregate(&subject())
        .await
        .unwrap();

    assert_eq!(snapshot.degraded_segments.len(), 3);
    assert!(snapshot.merged["platforms"].as_object().unwrap().is_empty());
    assert!(snapshot.merged.get("summarized_review").is_some());
}

#[tokio::test]
async fn unparsable_synthesis_is_fatal() {
    let server = MockServer::start().await;
    mount_segments(
        &server,
        completion(json!({"platforms": {"amazon": {"url": "https://amazon.com/x"}}})),
        completion(json!({"platforms": {}})),
        completion(json!({"platforms": {}})),
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant",
                "content": "I was unable to synthesize anything useful."}}]
        })),
    )
    .await;

    let err = test_pipeline(server.uri())
        .aggregate(&subject())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            IngestError::Unparsable {
                segment: Segment::Synthesis
            }
        ),
        "expected Unparsable(synthesis), got: {err:?}"
    );
    assert!(!err.is_segment_local());
}

#[tokio::test]
async fn aggregate_validated_returns_a_typed_snapshot() {
    let server = MockServer::start().await;
    mount_segments(
        &server,
        completion(json!({"platforms": {"amazon": {"url": "https://amazon.com/x"}}})),
        completion(json!({"platforms": {}})),
        completion(json!({"platforms": {}})),
        completion(synthesis_payload()),
    )
    .await;

    let validated = test_pipeline(server.uri())
        .aggregate_validated(&subject())
        .await
        .unwrap();
    assert_eq!(validated.snapshot.product_identity.name, "Velvet Matte Lipstick");
    assert!(validated
        .snapshot
        .platforms
        .contains_key(&lumina_core::PlatformKey::Amazon));
    assert_eq!(validated.prompt_hash.len(), 64);
}

#[tokio::test]
async fn aggregate_validated_surfaces_schema_drift_as_validation_error() {
    let server = MockServer::start().await;
    // A platform outside the closed key set is schema drift, not noise.
    mount_segments(
        &server,
        completion(json!({"platforms": {"tiktok": {"summary": "viral"}}})),
        completion(json!({"platforms": {}})),
        completion(json!({"platforms": {}})),
        completion(synthesis_payload()),
    )
    .await;

    let err = test_pipeline(server.uri())
        .aggregate_validated(&subject())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, IngestError::Validation(failure)
            if failure.reasons.iter().any(|r| r.contains("tiktok"))),
        "expected Validation naming the stray key, got: {err:?}"
    );
    assert!(!err.is_segment_local());
}

#[tokio::test]
async fn fan_out_platforms_override_synthesis_platforms() {
    let server = MockServer::start().await;
    let mut synthesis = synthesis_payload();
    synthesis["platforms"] = json!({"amazon": {"url": "https://stale.example"}});
    mount_segments(
        &server,
        completion(json!({"platforms": {"amazon": {"url": "https://amazon.com/x"}}})),
        completion(json!({"platforms": {}})),
        completion(json!({"platforms": {}})),
        completion(synthesis),
    )
    .await;

    let snapshot = test_pipeline(server.uri())
        .aggregate(&subject())
        .await
        .unwrap();
    assert_eq!(
        snapshot.merged["platforms"]["amazon"]["url"],
        "https://amazon.com/x"
    );
}
