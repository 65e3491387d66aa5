//! The refinement operation.
//!
//! [`RefinementService`] is the one piece with decision logic: check the
//! credential, validate the note, render the prompt, call the gateway once,
//! and hand back exactly the two generated fields. It never retries and
//! never invents a fallback; that is the consumer's call (see
//! [`workflow`](crate::workflow)).
//!
//! Consumers depend on the [`Refiner`] trait rather than on the service, so
//! the same workflow runs in-process or against the HTTP operation through
//! [`TransformClient`](crate::client::TransformClient).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RefineConfig;
use crate::error::{GenerationError, RefineError};
use crate::generation::{OutputSchema, TextGenerator};
use crate::prompt::build_refinement_prompt;

/// Schema name sent with the response format.
pub const OUTPUT_SCHEMA_NAME: &str = "observation_record";

// ── Request ────────────────────────────────────────────────────────

/// One note to refine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementRequest {
    raw_note: String,
    student_names: Vec<String>,
    domain_tags: Vec<String>,
}

impl RefinementRequest {
    /// Build a request. A blank note is rejected with
    /// [`RefineError::InvalidInput`].
    pub fn new(
        raw_note: impl Into<String>,
        student_names: Vec<String>,
        domain_tags: Vec<String>,
    ) -> Result<Self, RefineError> {
        let raw_note = raw_note.into();
        if raw_note.trim().is_empty() {
            return Err(RefineError::InvalidInput);
        }
        Ok(Self {
            raw_note,
            student_names,
            domain_tags,
        })
    }

    pub fn raw_note(&self) -> &str {
        &self.raw_note
    }

    pub fn student_names(&self) -> &[String] {
        &self.student_names
    }

    pub fn domain_tags(&self) -> &[String] {
        &self.domain_tags
    }

    /// Render the generation prompt for this request.
    pub fn prompt(&self) -> String {
        build_refinement_prompt(&self.raw_note, &self.student_names, &self.domain_tags)
    }
}

/// JSON body of `POST /api/transform`.
///
/// Absent or `null` arrays mean "no context". An absent `rawContent`
/// deserializes to an empty string so it is rejected as invalid input
/// rather than as a malformed body.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransformBody {
    #[serde(default)]
    pub raw_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_tags: Option<Vec<String>>,
}

impl TransformBody {
    pub fn into_request(self) -> Result<RefinementRequest, RefineError> {
        RefinementRequest::new(
            self.raw_content,
            self.student_names.unwrap_or_default(),
            self.domain_tags.unwrap_or_default(),
        )
    }
}

impl From<&RefinementRequest> for TransformBody {
    fn from(req: &RefinementRequest) -> Self {
        Self {
            raw_content: req.raw_note.clone(),
            student_names: Some(req.student_names.clone()),
            domain_tags: Some(req.domain_tags.clone()),
        }
    }
}

// ── Result ─────────────────────────────────────────────────────────

/// A refined observation. Both fields are non-empty when produced by the
/// service.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefinementResult {
    #[schemars(
        description = "Formal observation record in Korean: third person, past tense, 2-3 sentences, keeping the children's names as given"
    )]
    pub refined_content: String,
    #[schemars(
        description = "Brief developmental interpretation and follow-up teaching plan in Korean, 1-2 sentences"
    )]
    pub interpretation: String,
}

impl RefinementResult {
    /// The output schema the gateway is held to.
    pub fn output_schema() -> OutputSchema {
        OutputSchema::for_type::<RefinementResult>(OUTPUT_SCHEMA_NAME)
    }

    fn ensure_filled(self) -> Result<Self, GenerationError> {
        if self.refined_content.trim().is_empty() {
            return Err(GenerationError::EmptyField {
                field: "refinedContent",
            });
        }
        if self.interpretation.trim().is_empty() {
            return Err(GenerationError::EmptyField {
                field: "interpretation",
            });
        }
        Ok(self)
    }
}

// ── Refiner ────────────────────────────────────────────────────────

/// Boxed future returned by [`Refiner::refine`].
pub type RefineFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RefinementResult, RefineError>> + Send + 'a>>;

/// Anything that can turn a [`RefinementRequest`] into a
/// [`RefinementResult`].
pub trait Refiner: Send + Sync {
    fn refine(&self, request: RefinementRequest) -> RefineFuture<'_>;
}

// ── Service ────────────────────────────────────────────────────────

/// Stateless refinement service.
pub struct RefinementService {
    generator: Arc<dyn TextGenerator>,
    config: RefineConfig,
    schema: OutputSchema,
}

impl RefinementService {
    /// Build a service over a gateway. The configuration decides whether
    /// the capability counts as configured.
    pub fn new(generator: Arc<dyn TextGenerator>, config: RefineConfig) -> Self {
        Self {
            generator,
            config,
            schema: RefinementResult::output_schema(),
        }
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Refine loose inputs: credential check, validation, generation.
    pub async fn transform(
        &self,
        raw_content: &str,
        student_names: Vec<String>,
        domain_tags: Vec<String>,
    ) -> Result<RefinementResult, RefineError> {
        self.ensure_configured()?;
        let request = RefinementRequest::new(raw_content, student_names, domain_tags)?;
        self.refine_request(&request).await
    }

    /// Refine an already validated request.
    pub async fn refine_request(
        &self,
        request: &RefinementRequest,
    ) -> Result<RefinementResult, RefineError> {
        self.ensure_configured()?;

        let prompt = request.prompt();
        debug!(
            "Refining note: {} chars, {} student(s), {} domain tag(s), prompt {} bytes",
            request.raw_note().chars().count(),
            request.student_names().len(),
            request.domain_tags().len(),
            prompt.len()
        );

        let outcome = self
            .generator
            .generate(&prompt, &self.schema)
            .await
            .and_then(|output| output.into_typed::<RefinementResult>())
            .and_then(RefinementResult::ensure_filled);

        match outcome {
            Ok(result) => {
                info!(
                    "Refinement complete: {} chars refined, {} chars interpretation",
                    result.refined_content.chars().count(),
                    result.interpretation.chars().count()
                );
                Ok(result)
            }
            Err(e) => {
                warn!("Refinement failed: {e}");
                Err(e.into())
            }
        }
    }

    fn ensure_configured(&self) -> Result<(), RefineError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(RefineError::Configuration)
        }
    }
}

impl Refiner for RefinementService {
    fn refine(&self, request: RefinementRequest) -> RefineFuture<'_> {
        Box::pin(async move { self.refine_request(&request).await })
    }
}
