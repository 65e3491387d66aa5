//! HTTP client for the refinement operation served by `ssamnote-web`.
//!
//! [`TransformClient`] implements [`Refiner`], so a [`NoteSession`] can run
//! against a remote service exactly as it runs against an in-process
//! [`RefinementService`](crate::refine::RefinementService). Wire error
//! bodies are mapped back onto [`RefineError`]; anything unexpected counts
//! as a generation failure, which the workflow absorbs into a degraded
//! draft.
//!
//! [`NoteSession`]: crate::workflow::NoteSession

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ErrorBody, GenerationError, RefineError};
use crate::refine::{RefineFuture, RefinementRequest, RefinementResult, Refiner, TransformBody};

/// Path of the refinement operation.
pub const TRANSFORM_PATH: &str = "/api/transform";

pub struct TransformClient {
    client: reqwest::Client,
    endpoint: String,
}

impl TransformClient {
    /// Client for the service rooted at `base_url`, e.g.
    /// `http://127.0.0.1:3001`.
    pub fn new(base_url: &str) -> Result<Self, RefineError> {
        Self::with_timeout(base_url, Duration::from_secs(120))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, RefineError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ssamnote/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RefineError::GenerationFailed(GenerationError::Transport(format!(
                    "failed to build HTTP client: {e}"
                )))
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}{TRANSFORM_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one request and decode the outcome.
    pub async fn transform(
        &self,
        request: &RefinementRequest,
    ) -> Result<RefinementResult, RefineError> {
        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&TransformBody::from(request))
            .send()
            .await
            .map_err(|e| RefineError::GenerationFailed(GenerationError::Transport(e.to_string())))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            RefineError::GenerationFailed(GenerationError::Transport(format!(
                "failed to read response: {e}"
            )))
        })?;
        debug!(
            "Transform response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => RefineError::from_body(&body),
                Err(_) => RefineError::GenerationFailed(GenerationError::Provider(format!(
                    "HTTP {status}"
                ))),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            RefineError::GenerationFailed(GenerationError::Malformed(format!(
                "failed to parse transform response: {e}"
            )))
        })
    }
}

impl Refiner for TransformClient {
    fn refine(&self, request: RefinementRequest) -> RefineFuture<'_> {
        Box::pin(async move { self.transform(&request).await })
    }
}
