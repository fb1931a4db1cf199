use export_engine::{
    ChatMessage, GenerationError, GenerationRequest, GenerationSettings, OpenAiChatClient,
    TextGenerator,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> GenerationRequest {
    GenerationRequest {
        messages: vec![
            ChatMessage::system("Summarize."),
            ChatMessage::user("Section: A\n\ntext"),
        ],
        primary_model: "primary".into(),
        fallback_model: Some("fallback".into()),
        temperature: 0.4,
        max_tokens: Some(200),
    }
}

fn client(server: &MockServer) -> OpenAiChatClient {
    let settings = GenerationSettings {
        base_url: format!("{}/v1/", server.uri()),
        ..GenerationSettings::default()
    };
    OpenAiChatClient::with_api_key(settings, Some("sk-test".into())).unwrap()
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn api_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "error": { "message": message } }))
}

#[tokio::test]
async fn posts_chat_completion_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "primary",
            "max_tokens": 200,
            "messages": [
                { "role": "system", "content": "Summarize." },
                { "role": "user", "content": "Section: A\n\ntext" }
            ]
        })))
        .respond_with(completion("- one\n- two"))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate(&request()).await.unwrap();
    assert_eq!(text, "- one\n- two");
}

#[tokio::test]
async fn unavailable_model_retries_with_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "primary" })))
        .respond_with(api_error(400, "The model `primary` does not exist"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "fallback" })))
        .respond_with(completion("from fallback"))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate(&request()).await.unwrap();
    assert_eq!(text, "from fallback");
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(api_error(429, "Rate limit reached"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert_eq!(err, GenerationError::RateLimited("Rate limit reached".into()));
}

#[tokio::test]
async fn bad_request_is_invalid_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(api_error(400, "messages must not be empty"))
        .mount(&server)
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert_eq!(
        err,
        GenerationError::InvalidInput("messages must not be empty".into())
    );
}

#[tokio::test]
async fn blank_completion_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("   "))
        .mount(&server)
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert_eq!(err, GenerationError::EmptyResponse);
}

#[tokio::test]
async fn server_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Failure(_)), "{err:?}");
}
