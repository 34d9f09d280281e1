//! # triage-review
//!
//! Inbox loading and the review session for inbox triage.
//!
//! - [`InboxLoader`] queries the host for tagged pages and fetches them in
//!   fixed-size batches.
//! - [`ReviewSession`] holds the loaded pages behind a cyclic cursor, reads
//!   ahead near the end, deletes and saves pages, and tracks AI insights.
//! - [`LogseqHost`] and [`MemoryGraph`] implement
//!   [`HostGraph`](triage_core::HostGraph) against a live Logseq instance
//!   and an in-memory graph.

pub mod config;
pub mod loader;
pub mod logseq;
pub mod memory;
pub mod session;

pub use config::ReviewConfig;
pub use loader::InboxLoader;
pub use logseq::{LogseqConfig, LogseqHost};
pub use memory::{CreatedPage, GraphFile, MemoryGraph, MemoryPage};
pub use session::{InferenceTicket, ReviewSession};
