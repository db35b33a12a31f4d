mod support;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokenprobe::types::chat::{ChatCompletionRequest, ChatMessage};
use tokenprobe::Client;

use support::completion_body;

#[tokio::test]
async fn bearer_header_is_inserted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&[("ok", 0.0)])))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
    let response = client.completions().create(&request).await.unwrap();
    assert_eq!(response.text(), Some("ok"));
}

#[tokio::test]
async fn authorization_header_respects_custom_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer custom-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .header("Authorization", "Bearer custom-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
    client.completions().create(&request).await.unwrap();
}

#[tokio::test]
async fn organization_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("openai-organization", "org-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "hey"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .api_key("test-key")
        .organization("org-123")
        .base_url(format!("{}/v1", server.uri()))
        .build()
        .unwrap();
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);
    let response = client.completions().create(&request).await.unwrap();
    assert_eq!(response.text(), Some("hey"));
}
