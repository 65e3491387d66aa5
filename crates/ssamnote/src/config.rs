//! Refinement configuration with sensible defaults.
//!
//! [`RefineConfig`] is an explicit value handed to the gateway and the
//! service at construction time. Nothing in the pipeline reads the
//! environment on its own; binaries call [`RefineConfig::from_env`] once and
//! apply their CLI overrides on top.

use std::fmt;
use std::time::Duration;

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_KEY";

/// Environment variable overriding the default model.
pub const MODEL_ENV: &str = "SSAMNOTE_MODEL";

/// Settings for the text-generation gateway.
#[derive(Clone)]
pub struct RefineConfig {
    /// Provider credential. `None` means the capability is not configured.
    pub api_key: Option<String>,
    /// Model identifier. Default: [`DEFAULT_MODEL`](crate::DEFAULT_MODEL).
    pub model: String,
    /// Sampling temperature. Default: `0.3`.
    pub temperature: f32,
    /// Maximum tokens per response. Default: `1024`.
    pub max_tokens: u32,
    /// Transport-level request timeout. Default: 120 seconds.
    pub timeout: Duration,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: crate::DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            timeout: Duration::from_secs(120),
        }
    }
}

// The key never shows up in logs.
impl fmt::Debug for RefineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RefineConfig {
    /// Read the credential and optional model override from the environment.
    ///
    /// An empty `OPENROUTER_KEY` counts as absent.
    pub fn from_env() -> Self {
        let mut config = Self::default().with_api_key(std::env::var(API_KEY_ENV).ok());
        if let Ok(model) = std::env::var(MODEL_ENV)
            && !model.trim().is_empty()
        {
            config.model = model;
        }
        config
    }

    /// Set (or clear) the credential. Blank keys are stored as `None`.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Whether a credential is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
