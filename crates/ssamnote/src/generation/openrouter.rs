//! [`TextGenerator`] backed by the OpenRouter chat completions API.

use tracing::debug;

use super::{GenerateFuture, OutputSchema, TextGenerator};
use crate::config::RefineConfig;
use crate::error::GenerationError;
use crate::{ChatRequest, Message, OpenRouterClient, ResponseFormat};

/// Production gateway: one chat completion per call, constrained by a
/// `json_schema` response format and validated against the same schema.
pub struct OpenRouterGenerator {
    /// `None` when no credential is configured.
    client: Option<OpenRouterClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterGenerator {
    /// Build a generator from configuration.
    ///
    /// A missing credential is not an error here; every
    /// [`generate`](TextGenerator::generate) call then fails with
    /// [`GenerationError::NotConfigured`] without touching the network.
    pub fn new(config: &RefineConfig) -> Result<Self, GenerationError> {
        let client = match &config.api_key {
            Some(key) => Some(OpenRouterClient::with_timeout(key.clone(), config.timeout)?),
            None => None,
        };
        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Replace the underlying client (custom endpoint, test server).
    pub fn with_client(mut self, client: OpenRouterClient) -> Self {
        self.client = Some(client);
        self
    }

    fn request_for(&self, prompt: &str, schema: &OutputSchema) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: Some(ResponseFormat::json_schema(
                schema.name(),
                schema.schema().clone(),
            )),
        }
    }
}

impl TextGenerator for OpenRouterGenerator {
    fn generate<'a>(&'a self, prompt: &'a str, schema: &'a OutputSchema) -> GenerateFuture<'a> {
        Box::pin(async move {
            let client = self.client.as_ref().ok_or(GenerationError::NotConfigured)?;
            let body = self.request_for(prompt, schema);
            let completion = client.chat(&body).await?;

            if let Some(refusal) = completion.refusal {
                return Err(GenerationError::Provider(format!("model refused: {refusal}")));
            }
            let content = completion
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| GenerationError::Malformed("empty completion".into()))?;
            debug!(
                "Structured output '{}': {} chars, finish_reason={}",
                schema.name(),
                content.chars().count(),
                completion.finish_reason.as_deref().unwrap_or("-")
            );
            schema.parse(&content)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP exchange on a random local port, answering
    /// with `status` and `body`. The handle yields the raw request text.
    async fn one_shot_provider(status: u16, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}/api/v1/chat/completions"), handle)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        buf.len() >= header_end + 4 + content_length
    }

    fn completion(content: &str) -> String {
        json!({
            "choices": [{"message": {"content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
        .to_string()
    }

    fn generator_at(url: String) -> OpenRouterGenerator {
        let config = RefineConfig::default()
            .with_api_key(Some("sk-test".into()))
            .with_temperature(0.7);
        OpenRouterGenerator::new(&config)
            .unwrap()
            .with_client(OpenRouterClient::new("sk-test").unwrap().with_url(url))
    }

    async fn generate_against(
        status: u16,
        body: String,
    ) -> Result<serde_json::Value, GenerationError> {
        let (url, server) = one_shot_provider(status, body).await;
        let result = generator_at(url).generate("메모", &schema()).await;
        server.await.unwrap();
        result.map(|output| output.value().clone())
    }

    fn schema() -> OutputSchema {
        OutputSchema::new(
            "note",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"],
                "additionalProperties": false
            }),
        )
    }

    #[tokio::test]
    async fn unconfigured_fails_before_network() {
        let generator = OpenRouterGenerator::new(&RefineConfig::default()).unwrap();
        let err = generator.generate("prompt", &schema()).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[test]
    fn request_carries_schema_and_prompt() {
        let config = RefineConfig::default()
            .with_api_key(Some("sk-test".into()))
            .with_model("openai/gpt-4o-mini");
        let generator = OpenRouterGenerator::new(&config).unwrap();
        let req = generator.request_for("메모", &schema());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "openai/gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "메모");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "note");
        assert_eq!(
            json["response_format"]["json_schema"]["schema"]["required"][0],
            "text"
        );
    }

    #[test]
    fn request_carries_configured_temperature() {
        let config = RefineConfig::default()
            .with_api_key(Some("sk-test".into()))
            .with_temperature(0.7);
        let generator = OpenRouterGenerator::new(&config).unwrap();
        let req = generator.request_for("메모", &schema());
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    // ── Over HTTP ──

    #[tokio::test]
    async fn conforming_reply_is_returned() {
        let (url, server) = one_shot_provider(200, completion(r#"{"text": "정제된 기록"}"#)).await;
        let output = generator_at(url).generate("메모", &schema()).await.unwrap();
        assert_eq!(output.value(), &json!({"text": "정제된 기록"}));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v1/chat/completions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["messages"][0]["content"], "메모");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn refusal_is_provider_error() {
        let body = json!({
            "choices": [{"message": {"content": null, "refusal": "cannot help"}}]
        });
        let err = generate_against(200, body.to_string()).await.unwrap_err();
        match err {
            GenerationError::Provider(msg) => assert_eq!(msg, "model refused: cannot help"),
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let err = generate_against(200, json!({"choices": []}).to_string())
            .await
            .unwrap_err();
        match err {
            GenerationError::Malformed(msg) => assert_eq!(msg, "empty completion"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_content_is_malformed() {
        let err = generate_against(200, completion("   ")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn error_payload_is_provider_error() {
        let body = json!({"error": {"message": "rate limited", "code": 429}});
        let err = generate_against(200, body.to_string()).await.unwrap_err();
        match err {
            GenerationError::Provider(msg) => assert_eq!(msg, "rate limited"),
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_status_is_provider_error() {
        let body = json!({"error": {"message": "upstream down"}});
        let err = generate_against(500, body.to_string()).await.unwrap_err();
        match err {
            GenerationError::Provider(msg) => {
                assert!(msg.starts_with("HTTP 500"), "{msg}");
                assert!(msg.contains("upstream down"));
            }
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let err = generate_against(200, "<html>gateway</html>".into())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn non_json_content_is_malformed() {
        let err = generate_against(200, completion("정제된 기록입니다"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn schema_violation_is_mismatch() {
        let err = generate_against(200, completion(r#"{"text": 3, "extra": true}"#))
            .await
            .unwrap_err();
        match err {
            GenerationError::SchemaMismatch { violations } => assert!(!violations.is_empty()),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }
}
