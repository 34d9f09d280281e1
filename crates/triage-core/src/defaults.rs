//! Centralized default constants for inbox triage.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration layers fall back to these when an environment variable or
//! CLI flag is not set.

// =============================================================================
// INBOX LOADING
// =============================================================================

/// Tag that marks a page as belonging to the review inbox.
pub const INBOX_TAG: &str = "highlights";

/// Pages fetched per loader invocation.
pub const BATCH_SIZE: usize = 10;

// =============================================================================
// REVIEW SESSION
// =============================================================================

/// Readahead fires once the cursor is within this many pages of the loaded end.
pub const PREFETCH_THRESHOLD: usize = 5;

/// Largest accepted readahead threshold.
pub const MAX_PREFETCH_THRESHOLD: usize = 1_000;

/// Delay after navigation before AI status settles from processing to complete.
pub const STATUS_SETTLE_MS: u64 = 1000;

/// Tag written onto pages created by the save action.
pub const REVIEWED_TAG: &str = "reviewed";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default local inference server (Ollama).
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Default generation model.
pub const GEN_MODEL: &str = "llama3.2";

/// Health check request timeout (seconds).
pub const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Generation slower than this is logged as a slow operation (milliseconds).
pub const SLOW_GEN_MS: u64 = 30_000;

/// A leading `label:` prefix longer than this is treated as content, not a label.
pub const LABEL_MAX_LEN: usize = 32;

// =============================================================================
// HOST API
// =============================================================================

/// Default Logseq HTTP API server endpoint.
pub const LOGSEQ_API_URL: &str = "http://127.0.0.1:12315/api";
