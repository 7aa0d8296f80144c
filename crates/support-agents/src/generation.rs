//! The structured-generation boundary.
//!
//! Stages never talk to a concrete model client. They go through
//! [`StructuredGenerator`], which maps a prompt plus a JSON schema to a raw
//! value, and the typed [`generate`] wrapper, which derives the schema,
//! deserializes the value, and enforces the confidence bound. A malformed
//! or out-of-range response surfaces as a [`GenerationError`] before any
//! stage logic sees it. The pipeline never retries; that belongs to the
//! backend or the caller.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{self, SupportConfig};
use crate::contracts::StageOutput;
use crate::prompts;

/// Failure at the structured-generation boundary. Fatal for the stage
/// that hit it.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The completion request itself failed (network, backend, timeout).
    #[error("completion request failed: {0}")]
    Request(String),

    /// The response did not conform to the target schema.
    #[error("{target} output failed schema validation: {detail}")]
    SchemaViolation {
        target: &'static str,
        detail: String,
    },

    /// A confidence score escaped the [0.0, 1.0] data contract.
    #[error("{target} confidence {value} outside [0.0, 1.0]")]
    ConfidenceOutOfRange { target: &'static str, value: f64 },
}

/// Capability that produces a schema-conforming value for a prompt.
///
/// `target` names the expected shape for logs and errors. Tests substitute
/// deterministic implementations; stages stay provider-agnostic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate_value(
        &self,
        target: &'static str,
        schema: serde_json::Value,
        prompt: &str,
    ) -> Result<serde_json::Value, GenerationError>;
}

/// Typed front door over [`StructuredGenerator::generate_value`].
///
/// Derives the schema for `T`, requests a value, deserializes it, and
/// rejects confidence scores outside [0.0, 1.0].
pub async fn generate<T>(
    generator: &dyn StructuredGenerator,
    prompt: &str,
) -> Result<T, GenerationError>
where
    T: StageOutput + DeserializeOwned + JsonSchema,
{
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    let schema = serde_json::to_value(schema).map_err(|e| GenerationError::SchemaViolation {
        target: T::TARGET,
        detail: e.to_string(),
    })?;

    let value = generator.generate_value(T::TARGET, schema, prompt).await?;
    let output: T =
        serde_json::from_value(value).map_err(|e| GenerationError::SchemaViolation {
            target: T::TARGET,
            detail: e.to_string(),
        })?;

    let confidence = output.confidence();
    if !(0.0..=1.0).contains(&confidence) {
        return Err(GenerationError::ConfidenceOutOfRange {
            target: T::TARGET,
            value: confidence,
        });
    }
    Ok(output)
}

/// Generator backed by an OpenAI-compatible completions endpoint via rig.
///
/// Each call builds a one-shot agent with a strict-JSON preamble, appends
/// the target schema to the prompt, and parses the reply fail-closed.
pub struct RigGenerator {
    client: openai::CompletionsClient,
    model: String,
}

impl RigGenerator {
    pub fn from_config(cfg: &SupportConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: config::build_client(cfg)?,
            model: cfg.endpoint.model.clone(),
        })
    }
}

#[async_trait]
impl StructuredGenerator for RigGenerator {
    async fn generate_value(
        &self,
        target: &'static str,
        schema: serde_json::Value,
        prompt: &str,
    ) -> Result<serde_json::Value, GenerationError> {
        let agent = self
            .client
            .agent(&self.model)
            .name(target)
            .preamble(prompts::EXTRACTOR_PREAMBLE)
            .temperature(0.1)
            .build();

        let request = format!(
            "{prompt}\n\nReply with a single JSON object conforming to this JSON schema:\n{schema}"
        );
        let raw = agent
            .prompt(request.as_str())
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let json_str = extract_json_block(&raw).unwrap_or(raw.as_str());
        debug!(target, bytes = json_str.len(), "structured response received");

        serde_json::from_str(json_str).map_err(|e| GenerationError::SchemaViolation {
            target,
            detail: e.to_string(),
        })
    }
}

/// Try to extract a JSON block from a response that may contain surrounding text.
fn extract_json_block(text: &str) -> Option<&str> {
    // Look for ```json ... ``` fenced blocks
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    // Look for first { to last }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::TriageOutput;
    use serde_json::json;

    #[test]
    fn test_extract_json_block_fenced() {
        let raw = "Here you go:\n```json\n{\"intent\": \"x\"}\n```\nDone.";
        assert_eq!(extract_json_block(raw), Some("{\"intent\": \"x\"}"));
    }

    #[test]
    fn test_extract_json_block_braces() {
        let raw = "Sure. {\"a\": {\"b\": 1}} hope that helps";
        assert_eq!(extract_json_block(raw), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_block_absent() {
        assert_eq!(extract_json_block("no json here"), None);
    }

    fn triage_value(confidence: f64) -> serde_json::Value {
        json!({
            "intent": "refund_request",
            "priority": "high",
            "confidence": confidence,
            "reasoning": "mentions a refund",
            "requires_order_lookup": true,
            "suggested_tags": ["refund"],
        })
    }

    #[tokio::test]
    async fn test_generate_returns_typed_output() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_value()
            .withf(|target, schema, prompt| {
                target == "triage"
                    && schema["required"].as_array().is_some()
                    && prompt.contains("classify")
            })
            .returning(|_, _, _| Ok(triage_value(0.92)));

        let output: TriageOutput = generate(&mock, "please classify this").await.unwrap();
        assert_eq!(output.intent, "refund_request");
        assert!(output.requires_order_lookup);
    }

    #[tokio::test]
    async fn test_generate_rejects_nonconforming_value() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_value()
            .returning(|_, _, _| Ok(json!({"intent": "x"})));

        let result = generate::<TriageOutput>(&mock, "classify").await;
        assert!(matches!(
            result,
            Err(GenerationError::SchemaViolation { target: "triage", .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_rejects_out_of_range_confidence() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_value()
            .returning(|_, _, _| Ok(triage_value(1.5)));

        let result = generate::<TriageOutput>(&mock, "classify").await;
        assert!(matches!(
            result,
            Err(GenerationError::ConfidenceOutOfRange { value, .. }) if value > 1.0
        ));
    }

    #[tokio::test]
    async fn test_generate_propagates_request_failure() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_value()
            .returning(|_, _, _| Err(GenerationError::Request("backend down".into())));

        let result = generate::<TriageOutput>(&mock, "classify").await;
        assert!(matches!(result, Err(GenerationError::Request(_))));
    }
}
