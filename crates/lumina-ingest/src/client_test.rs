use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn test_config(base_url: String) -> ModelClientConfig {
    ModelClientConfig {
        base_url,
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        max_tokens: 256,
        temperature: 0.1,
        call_timeout_secs: 5,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn complete_returns_raw_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(
            serde_json::json!({"model": "test-model", "max_tokens": 256}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("{\"platforms\":{}}")))
        .mount(&server)
        .await;

    let client = ModelClient::new(test_config(server.uri())).unwrap();
    let raw = client
        .complete(Segment::Retail, "system framing", "user request")
        .await
        .unwrap();
    assert_eq!(raw, "{\"platforms\":{}}");
}

#[tokio::test]
async fn complete_trims_trailing_slash_in_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let client = ModelClient::new(test_config(format!("{}/", server.uri()))).unwrap();
    let raw = client.complete(Segment::Retail, "s", "u").await.unwrap();
    assert_eq!(raw, "ok");
}

#[tokio::test]
async fn non_success_status_maps_to_model_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = ModelClient::new(test_config(server.uri())).unwrap();
    let err = client
        .complete(Segment::Editorial, "s", "u")
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            IngestError::ModelStatus {
                segment: Segment::Editorial,
                status: 429
            }
        ),
        "expected ModelStatus(429), got: {err:?}"
    );
}

#[tokio::test]
async fn empty_choices_maps_to_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ModelClient::new(test_config(server.uri())).unwrap();
    let err = client
        .complete(Segment::Influencer, "s", "u")
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            IngestError::EmptyCompletion {
                segment: Segment::Influencer
            }
        ),
        "expected EmptyCompletion, got: {err:?}"
    );
}

#[tokio::test]
async fn whitespace_only_content_maps_to_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   \n")))
        .mount(&server)
        .await;

    let client = ModelClient::new(test_config(server.uri())).unwrap();
    let err = client.complete(Segment::Retail, "s", "u").await.unwrap_err();
    assert!(matches!(err, IngestError::EmptyCompletion { .. }));
}

#[tokio::test]
async fn call_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("late"))
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(server.uri());
    config.call_timeout_secs = 1;
    let client = ModelClient::new(config).unwrap();
    let err = client.complete(Segment::Retail, "s", "u").await.unwrap_err();
    assert!(
        matches!(
            err,
            IngestError::Timeout {
                segment: Segment::Retail,
                secs: 1
            }
        ),
        "expected Timeout, got: {err:?}"
    );
}
