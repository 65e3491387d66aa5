//! Error types for the refinement pipeline.
//!
//! [`GenerationError`] describes what went wrong inside the text-generation
//! gateway. [`RefineError`] is the public taxonomy of the refinement
//! operation; its `Display` strings are the fixed, non-sensitive messages
//! returned to callers, so gateway details never leak through them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of a single gateway invocation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No access credential is configured. Reported before any network call.
    #[error("no API key configured for the generation provider")]
    NotConfigured,

    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status or an error payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider answered, but the content was not a JSON document.
    #[error("malformed output: {0}")]
    Malformed(String),

    /// The output did not conform to the declared output schema.
    #[error("output does not match schema:\n{}", .violations.join("\n"))]
    SchemaMismatch { violations: Vec<String> },

    /// A required field was present but blank.
    #[error("output field '{field}' is empty")]
    EmptyField { field: &'static str },
}

/// Failures of the refinement operation, as seen by its callers.
#[derive(Debug, Error)]
pub enum RefineError {
    /// The generation capability has no credential.
    #[error("generation capability not configured")]
    Configuration,

    /// The raw note is missing or blank.
    #[error("rawContent is required")]
    InvalidInput,

    /// The gateway failed. The source is for logs only.
    #[error("failed to transform content")]
    GenerationFailed(#[source] GenerationError),
}

impl RefineError {
    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RefineError::Configuration => "CONFIGURATION_ERROR",
            RefineError::InvalidInput => "INVALID_INPUT",
            RefineError::GenerationFailed(_) => "GENERATION_FAILED",
        }
    }

    /// HTTP status class for this failure.
    pub fn status(&self) -> u16 {
        match self {
            RefineError::InvalidInput => 400,
            RefineError::Configuration | RefineError::GenerationFailed(_) => 500,
        }
    }

    /// Rebuild an error from a wire [`ErrorBody`] returned by the service.
    ///
    /// Unknown codes are treated as generation failures so the consumer
    /// still takes its fallback path.
    pub fn from_body(body: &ErrorBody) -> Self {
        match body.code.as_deref() {
            Some("CONFIGURATION_ERROR") => RefineError::Configuration,
            Some("INVALID_INPUT") => RefineError::InvalidInput,
            _ => RefineError::GenerationFailed(GenerationError::Provider(body.error.clone())),
        }
    }
}

impl From<GenerationError> for RefineError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::NotConfigured => RefineError::Configuration,
            other => RefineError::GenerationFailed(other),
        }
    }
}

/// JSON body of a failed transform response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&RefineError> for ErrorBody {
    fn from(e: &RefineError) -> Self {
        Self {
            error: e.to_string(),
            code: Some(e.code().to_string()),
        }
    }
}

/// Failures of the note-editing workflow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("the observation note is empty")]
    EmptyNote,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("operation '{operation}' is not allowed while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("failed to save the log: {0}")]
    SaveFailed(String),
}

/// Failures of a log sink.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log store unavailable: {0}")]
    Unavailable(String),

    #[error("rejected log: {0}")]
    Rejected(String),
}
