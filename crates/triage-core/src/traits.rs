//! Core traits for triage collaborators.
//!
//! These traits define the interfaces the host application and the inference
//! server must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// HOST TRAITS
// =============================================================================

/// The note-taking application hosting the inbox.
///
/// Implementations translate host failures into the matching error kind:
/// [`Error::Query`](crate::Error::Query) for the tag query,
/// [`Error::Fetch`](crate::Error::Fetch) for block trees, and so on.
#[async_trait]
pub trait HostGraph: Send + Sync {
    /// All pages whose tag collection includes `tag`. Order is unspecified.
    async fn pages_with_tag(&self, tag: &str) -> Result<Vec<PageEntity>>;

    /// Ordered top-level blocks of a page, children nested.
    async fn page_blocks_tree(&self, page: &PageEntity) -> Result<Vec<LeafBlock>>;

    /// Delete a page from the graph.
    async fn delete_page(&self, page: &InboxPage) -> Result<()>;

    /// Create a page carrying the given properties.
    async fn create_page(&self, name: &str, properties: &PageProperties) -> Result<()>;

    /// Show a transient notification to the user.
    async fn show_message(&self, message: &str, kind: MessageKind) -> Result<()> {
        match kind {
            MessageKind::Error | MessageKind::Warning => warn!(subsystem = "host", "{}", message),
            MessageKind::Success => info!(subsystem = "host", "{}", message),
        }
        Ok(())
    }
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for a prompt with an explicitly named model.
    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String>;

    /// Generate text with the backend's configured model.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let model = self.model_name();
        self.generate_with_model(model, prompt).await
    }

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Generation backend that can also report whether its server is reachable.
#[async_trait]
pub trait InferenceBackend: GenerationBackend {
    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool>;
}
