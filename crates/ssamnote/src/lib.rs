//! Classroom observation notes refined into formal developmental records.
//!
//! `ssamnote` takes the informal notes an early-childhood teacher jots down
//! during the school day ("철수가 블록으로 탑을 쌓았다") and turns them into
//! formally phrased, third-person, past-tense observation records with a
//! short developmental interpretation. The rewrite is done by an external
//! language model behind the [`TextGenerator`](generation::TextGenerator)
//! interface; everything around it is plain data and a small state machine.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use ssamnote::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let config = RefineConfig::from_env();
//!     let generator = OpenRouterGenerator::new(&config).map_err(|e| e.to_string())?;
//!     let service = RefinementService::new(Arc::new(generator), config);
//!
//!     let mut session = NoteSession::new(chrono::Local::now().date_naive(), "tb3");
//!     session.set_raw_note("철수가 블록으로 탑을 쌓았다").map_err(|e| e.to_string())?;
//!     session.submit(&service).await.map_err(|e| e.to_string())?;
//!
//!     let draft = session.draft().expect("previewing");
//!     println!("{}\n{}", draft.refined_content, draft.interpretation);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **The model call:** [`generation::TextGenerator`] is the gateway
//!   interface. [`generation::OpenRouterGenerator`] implements it over the
//!   [`OpenRouterClient`] below; [`generation::CannedGenerator`] is the test
//!   double. [`generation::OutputSchema`] carries the hard output contract.
//!
//! - **The prompt:** [`prompt::build_refinement_prompt`] renders the fixed
//!   instruction template on top of [`prompt::PromptBuilder`].
//!
//! - **The operation:** [`refine::RefinementService`] validates, builds the
//!   prompt, calls the gateway and shapes the result. It implements
//!   [`refine::Refiner`], as does [`client::TransformClient`], the HTTP
//!   client for the same operation served by `ssamnote-web`.
//!
//! - **The editing workflow:** [`workflow::NoteSession`] walks a note from
//!   editing through preview to saved, applying the fallback policy when the
//!   refinement fails.
//!
//! - **Records and storage:** [`record`] holds log, student, time block and
//!   domain tag types; [`store::LogSink`] is the persistence seam with an
//!   in-memory implementation.
//!
//! - **Reading back:** [`timeline`] groups a day's logs by time block and
//!   [`report`] builds weekly and per-student monthly summaries.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`generation`] | Gateway trait, output schema, OpenRouter and canned generators |
//! | [`prompt`] | Section-based prompt builder and the refinement template |
//! | [`refine`] | Request/result types, [`Refiner`](refine::Refiner), the service |
//! | [`workflow`] | Note editing state machine and editable drafts |
//! | [`record`] | Logs, students, time blocks, domain tags, weather |
//! | [`store`] | [`LogSink`](store::LogSink) and [`MemoryLogStore`](store::MemoryLogStore) |
//! | [`timeline`] | Per-day view grouped by time block |
//! | [`report`] | Weekly summary and student monthly report |
//! | [`client`] | HTTP client for `POST /api/transform` |
//! | [`config`] | [`RefineConfig`](config::RefineConfig) |
//! | [`error`] | Error taxonomy |

pub mod client;
pub mod config;
pub mod error;
pub mod generation;
pub mod prelude;
pub mod prompt;
pub mod record;
pub mod refine;
pub mod report;
pub mod store;
pub mod timeline;
pub mod workflow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::GenerationError;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for refinement calls.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`.
///
/// The draft marker and title are dropped so the value can be embedded
/// directly in a `response_format` payload.
///
/// ```
/// use ssamnote::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Summary {
///     text: String,
/// }
///
/// let schema = json_schema_for::<Summary>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema.get("$schema").is_none());
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_schema")]
    JsonSchema,
}

/// Output format constraint for the completion.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchemaFormat>,
}

impl ResponseFormat {
    /// Constrain the completion to a named JSON Schema.
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonSchema,
            json_schema: Some(JsonSchemaFormat {
                name: name.into(),
                strict: true,
                schema,
            }),
        }
    }
}

/// Named schema payload of a `json_schema` response format.
#[derive(Serialize, Debug)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub refusal: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl OpenRouterClient {
    /// Create a client with the default endpoint and a 120 second timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_timeout(api_key, Duration::from_secs(120))
    }

    /// Create a client with a custom transport timeout.
    pub fn with_timeout(
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ssamnote/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            url: OPENROUTER_URL.to_string(),
        })
    }

    /// Point the client at a different chat-completions endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, GenerationError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(GenerationError::Provider(format!("HTTP {status}: {text}")));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Malformed(format!("failed to parse response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(GenerationError::Provider(err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        match parsed.choices.and_then(|c| c.into_iter().next()) {
            Some(c) => Ok(ChatCompletion {
                content: c.message.content,
                refusal: c.message.refusal,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            }),
            None => Ok(ChatCompletion {
                content: None,
                refusal: None,
                usage: parsed.usage,
                finish_reason: None,
            }),
        }
    }
}
