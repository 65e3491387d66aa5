//! Output schema contract for structured generation.
//!
//! An [`OutputSchema`] is sent to the provider as the response format and
//! then enforced again on whatever comes back. Conformance is checked with
//! `jsonschema`; a reply that parses but violates the schema is a
//! [`GenerationError::SchemaMismatch`].

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::GenerationError;
use crate::json_schema_for;

/// A named JSON Schema that generated output must satisfy.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    name: String,
    schema: serde_json::Value,
}

impl OutputSchema {
    /// Wrap an explicit schema value.
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the schema from a `JsonSchema` type.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        Self::new(name, json_schema_for::<T>())
    }

    /// Schema name sent with the response format.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw schema document.
    pub fn schema(&self) -> &serde_json::Value {
        &self.schema
    }

    /// Names listed under `required`.
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema["required"]
            .as_array()
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }

    /// Parse raw completion text as JSON and check it against the schema.
    pub fn parse(&self, content: &str) -> Result<StructuredOutput, GenerationError> {
        let value: serde_json::Value = serde_json::from_str(content.trim())
            .map_err(|e| GenerationError::Malformed(format!("completion is not JSON: {e}")))?;
        self.conform(value)
    }

    /// Check a JSON value against the schema.
    pub fn conform(&self, value: serde_json::Value) -> Result<StructuredOutput, GenerationError> {
        let validator = jsonschema::validator_for(&self.schema).map_err(|e| {
            GenerationError::SchemaMismatch {
                violations: vec![format!("invalid output schema '{}': {e}", self.name)],
            }
        })?;

        let violations: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| format!("  - {}: {e}", e.instance_path()))
            .collect();

        if violations.is_empty() {
            Ok(StructuredOutput(value))
        } else {
            Err(GenerationError::SchemaMismatch { violations })
        }
    }
}

/// Generated output that passed [`OutputSchema::conform`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput(serde_json::Value);

impl StructuredOutput {
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Deserialize into the typed form of the schema.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, GenerationError> {
        serde_json::from_value(self.0).map_err(|e| GenerationError::Malformed(e.to_string()))
    }
}
