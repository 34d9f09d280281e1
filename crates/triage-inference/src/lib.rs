//! # triage-inference
//!
//! Local LLM inference client for inbox triage.
//!
//! This crate provides:
//! - Ollama `/api/generate` backend, buffered or streamed
//! - NDJSON fragment decoding for streamed responses
//! - Title and summary prompts for an inbox page
//! - Joined title + summary generation with output sanitation
//!
//! # Feature Flags
//!
//! - `mock`: Enable [`mock::MockGenerationBackend`] for tests in other crates
//!
//! # Example
//!
//! ```rust,no_run
//! use triage_inference::OllamaBackend;
//! use triage_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env().unwrap();
//!     let text = backend.generate("Say hello").await.unwrap();
//!     println!("{}", text);
//! }
//! ```

pub mod insights;
pub mod ollama;
pub mod prompts;
pub mod sanitize;
pub mod streaming;

// Mock generation backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use insights::generate_insights;
pub use ollama::{GenerateMode, OllamaBackend, OllamaConfig};
pub use sanitize::sanitize_generated;
pub use streaming::NdjsonDecoder;
