//! Text-generation gateway.
//!
//! The [`TextGenerator`] trait is the one seam between this crate and the
//! language model. An implementation takes a rendered prompt and an
//! [`OutputSchema`], performs exactly one generation, and returns a
//! [`StructuredOutput`] that is guaranteed to conform to the schema, or a
//! [`GenerationError`]. Implementations never retry.
//!
//! | Generator | Use case |
//! |-----------|----------|
//! | [`OpenRouterGenerator`] | Production: OpenRouter chat completions with a `json_schema` response format |
//! | [`CannedGenerator`] | Tests and offline runs: fixed replies plus a call counter |

pub mod canned;
pub mod openrouter;
pub mod schema;

pub use canned::{CannedGenerator, CannedReply};
pub use openrouter::OpenRouterGenerator;
pub use schema::{OutputSchema, StructuredOutput};

use std::future::Future;
use std::pin::Pin;

use crate::error::GenerationError;

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StructuredOutput, GenerationError>> + Send + 'a>>;

/// A generative text capability constrained to a fixed output schema.
///
/// Uses a boxed future so that the trait is dyn-compatible and can be shared
/// as `Arc<dyn TextGenerator>`.
///
/// # Contract
///
/// - A missing credential is reported as [`GenerationError::NotConfigured`]
///   without touching the network.
/// - Output with missing fields or wrong types is a failure, never a
///   partially filled value.
/// - One invocation issues at most one outbound request.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str, schema: &'a OutputSchema) -> GenerateFuture<'a>;
}
