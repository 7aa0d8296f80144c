//! Runtime configuration and LLM client construction.

use anyhow::{Context, Result};
use rig::providers::openai;

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// OpenAI-compatible completions endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub model: String,
}

/// Top-level pipeline configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct SupportConfig {
    /// Completions endpoint serving every stage.
    pub endpoint: Endpoint,
    /// API key for the endpoint ("not-needed" for local inference servers).
    pub api_key: String,
    /// Mean-confidence threshold quoted to the escalation stage.
    pub confidence_threshold: f64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint {
                url: std::env::var("SUPPORT_LLM_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
                model: std::env::var("SUPPORT_LLM_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".into()),
            },
            api_key: std::env::var("SUPPORT_LLM_API_KEY")
                .unwrap_or_else(|_| "not-needed".into()),
            confidence_threshold: std::env::var("SUPPORT_CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        }
    }
}

/// Build the rig client for the configured endpoint.
pub fn build_client(config: &SupportConfig) -> Result<openai::CompletionsClient> {
    openai::CompletionsClient::builder()
        .api_key(&config.api_key)
        .base_url(&config.endpoint.url)
        .build()
        .context("Failed to build completions client")
}

/// Check if the inference endpoint is reachable (GET /v1/models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{url}/models");
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
