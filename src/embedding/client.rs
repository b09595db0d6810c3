//! HTTP client for an Ollama-compatible embedding provider.
//!
//! Speaks the `/api/embed` batch endpoint, probes availability via
//! `/api/tags`, and can request a model pull via `/api/pull`. Errors are
//! surfaced as plain strings: callers fold them into `EmbeddingResult`
//! values rather than propagating them as faults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

impl OllamaClient {
    /// Build a client against `base_url` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// A client with the default local host and timeout.
    pub fn default_local() -> Result<Self, String> {
        Self::new(DEFAULT_HOST, DEFAULT_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed a batch of texts in one round trip.
    ///
    /// The provider returns one vector per input, in order.
    pub fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest { model, input: inputs };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| format!("embedding request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "embedding provider returned HTTP {}",
                response.status()
            ));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| format!("invalid embedding response: {e}"))?;

        if parsed.embeddings.len() != inputs.len() {
            return Err(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                inputs.len()
            ));
        }

        Ok(parsed.embeddings)
    }

    /// True if the provider answers its model-listing endpoint.
    pub fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("embedding provider not reachable at {}: {e}", self.base_url);
                false
            }
        }
    }

    /// Ask the provider to pull `model`. Best-effort.
    pub fn pull_model(&self, model: &str) -> Result<(), String> {
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            name: model,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| format!("model pull request failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("model pull returned HTTP {}", response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = OllamaClient::new("http://localhost:11434/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn unreachable_provider_reports_unavailable() {
        // Reserved port with nothing listening; the probe must report false,
        // not panic or hang (1s timeout).
        let client = OllamaClient::new("http://127.0.0.1:1", 1).unwrap();
        assert!(!client.is_available());
    }

    #[test]
    fn embed_against_dead_host_returns_err() {
        let client = OllamaClient::new("http://127.0.0.1:1", 1).unwrap();
        let result = client.embed("any-model", &["hello".to_string()]);
        assert!(result.is_err());
    }
}
