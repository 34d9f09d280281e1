//! Mock generation backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use triage_inference::mock::MockGenerationBackend;
//! use triage_core::GenerationBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockGenerationBackend::new()
//!         .with_response_mapping("title", "A Title")
//!         .with_fixed_response("Anything else");
//!
//!     let text = backend.generate("write a title").await.unwrap();
//!     assert_eq!(text, "A Title");
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use triage_core::{Error, GenerationBackend, InferenceBackend, Result};

/// Mock generation backend for testing.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    /// (prompt substring, response), first match wins
    responses: Vec<(String, String)>,
    default_response: String,
    /// Prompts containing any of these fail with a 500
    failures: Vec<String>,
    latency_ms: u64,
    healthy: bool,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub model: String,
    pub prompt: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Vec::new(),
            default_response: "Mock response".to_string(),
            failures: Vec::new(),
            latency_ms: 0,
            healthy: true,
        }
    }
}

impl MockGenerationBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the response for prompts matching no mapping.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Respond with `output` to any prompt containing `input`.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .responses
            .push((input.into(), output.into()));
        self
    }

    /// Fail any prompt containing `input` with an HTTP 500.
    pub fn with_failure_on(mut self, input: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failures.push(input.into());
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make health checks report the server as down.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Get number of generate calls.
    pub fn generate_call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String> {
        self.call_log.lock().unwrap().push(MockCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.failures.iter().any(|f| prompt.contains(f)) {
            return Err(Error::InferenceHttp {
                status: Some(500),
                message: "mock failure".to_string(),
            });
        }

        let response = self
            .config
            .responses
            .iter()
            .find(|(input, _)| prompt.contains(input))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| self.config.default_response.clone());
        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl InferenceBackend for MockGenerationBackend {
    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.healthy)
    }
}
