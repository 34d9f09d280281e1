//! Ollama inference backend implementation.
//!
//! Talks to `POST {base_url}/api/generate` with `{model, prompt, stream}`.
//! Buffered mode (the default) reads one JSON object; streamed mode reads
//! newline-delimited fragments and concatenates their `response` fields.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use triage_core::{defaults, env, Error, GenerationBackend, InferenceBackend, Result};

use crate::streaming::NdjsonDecoder;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Default generation model.
pub const DEFAULT_GEN_MODEL: &str = defaults::GEN_MODEL;

/// How the generate response body is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerateMode {
    /// `stream: false`, a single JSON object.
    #[default]
    Buffered,
    /// `stream: true`, newline-delimited JSON fragments.
    Streamed,
}

impl GenerateMode {
    fn is_streamed(self) -> bool {
        matches!(self, GenerateMode::Streamed)
    }
}

/// Connection settings for [`OllamaBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub mode: GenerateMode,
    /// Whole-request timeout. `None` waits indefinitely on a hung server.
    pub timeout_secs: Option<u64>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_GEN_MODEL.to_string(),
            mode: GenerateMode::Buffered,
            timeout_secs: None,
        }
    }
}

impl OllamaConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OLLAMA_BASE` | `http://localhost:11434` |
    /// | `OLLAMA_GEN_MODEL` | `llama3.2` |
    /// | `TRIAGE_GEN_STREAM` | `false` |
    /// | `TRIAGE_GEN_TIMEOUT_SECS` | unset (no timeout) |
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let mode = match env::flag("TRIAGE_GEN_STREAM")? {
            Some(true) => GenerateMode::Streamed,
            _ => GenerateMode::Buffered,
        };
        Ok(Self {
            base_url: env::var("OLLAMA_BASE").unwrap_or(defaults.base_url),
            model: env::var("OLLAMA_GEN_MODEL").unwrap_or(defaults.model),
            mode,
            timeout_secs: env::parse("TRIAGE_GEN_TIMEOUT_SECS")?,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url.trim_end_matches('/'))
    }
}

/// Ollama inference backend.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    /// Create a backend from explicit configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Ollama backend: url={}, model={}, mode={:?}",
            config.base_url, config.model, config.mode
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Set the generation model to use.
    pub fn set_model(&mut self, model: String) {
        info!(
            "Switching generation model from {} to {}",
            self.config.model, model
        );
        self.config.model = model;
    }

    pub fn set_mode(&mut self, mode: GenerateMode) {
        self.config.mode = mode;
    }

    /// POST the request and fail on transport errors or non-2xx status.
    async fn send(&self, request: &GenerateRequest<'_>) -> Result<Response> {
        let response = self
            .client
            .post(self.config.generate_url())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::InferenceHttp {
                status: None,
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InferenceHttp {
                status: Some(status.as_u16()),
                message: format!("Ollama returned {}: {}", status, body),
            });
        }
        Ok(response)
    }

    async fn read_buffered(&self, response: Response) -> Result<String> {
        let body = response.text().await.map_err(|e| Error::InferenceHttp {
            status: None,
            message: format!("Failed to read response body: {}", e),
        })?;
        let result: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::InferenceParse(format!("Failed to parse response: {}", e)))?;

        if let Some(message) = result.error {
            return Err(Error::InferenceHttp {
                status: None,
                message,
            });
        }
        result
            .response
            .ok_or_else(|| Error::InferenceParse("Response has no response field".to_string()))
    }

    async fn read_streamed(&self, response: Response) -> Result<String> {
        let mut decoder = NdjsonDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| Error::InferenceHttp {
                status: None,
                message: format!("Stream error: {}", e),
            })?;
            decoder.push(&bytes)?;
            if decoder.is_done() {
                break;
            }
        }

        debug!(fragments = decoder.fragment_count(), "Stream finished");
        decoder.finish()
    }
}

/// Request payload for the Ollama `/api/generate` endpoint.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Buffered response from the Ollama `/api/generate` endpoint.
#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    #[instrument(skip(self, prompt), fields(subsystem = "inference", component = "ollama", op = "generate", model = %model, prompt_len = prompt.len(), streamed = self.config.mode.is_streamed()))]
    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            model,
            prompt,
            stream: self.config.mode.is_streamed(),
        };

        let response = self.send(&request).await?;
        let text = match self.config.mode {
            GenerateMode::Buffered => self.read_buffered(response).await?,
            GenerateMode::Streamed => self.read_streamed(response).await?,
        };

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = text.len(),
            duration_ms = elapsed,
            "Generation complete"
        );
        if elapsed > defaults::SLOW_GEN_MS {
            warn!(
                duration_ms = elapsed,
                prompt_len = prompt.len(),
                slow = true,
                "Slow generation operation"
            );
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.config.tags_url())
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    info!("Ollama health check passed");
                    Ok(true)
                } else {
                    warn!("Ollama health check failed: {}", resp.status());
                    Ok(false)
                }
            }
            Err(e) => {
                warn!("Ollama health check error: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_OLLAMA_URL, "http://localhost:11434");
        assert_eq!(DEFAULT_GEN_MODEL, "llama3.2");
    }

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.mode, GenerateMode::Buffered);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_generate_url_joins_cleanly() {
        let config = OllamaConfig {
            base_url: "http://host:1234/".to_string(),
            ..OllamaConfig::default()
        };
        assert_eq!(config.generate_url(), "http://host:1234/api/generate");
        assert_eq!(config.tags_url(), "http://host:1234/api/tags");
    }

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Hello",
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3.2", "prompt": "Hello", "stream": false})
        );
    }

    #[test]
    fn test_generate_response_deserialization() {
        let json = r#"{"model":"m","created_at":"2024-01-01T00:00:00Z","response":"Hi","done":true}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response.as_deref(), Some("Hi"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_set_model_and_mode() {
        let mut backend = OllamaBackend::new(OllamaConfig::default()).unwrap();
        backend.set_model("qwen2.5:7b".to_string());
        backend.set_mode(GenerateMode::Streamed);
        assert_eq!(backend.model_name(), "qwen2.5:7b");
        assert_eq!(backend.config().mode, GenerateMode::Streamed);
    }

    #[test]
    fn test_timeout_config_builds_client() {
        let backend = OllamaBackend::new(OllamaConfig {
            timeout_secs: Some(5),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(backend.config().timeout_secs, Some(5));
    }
}
