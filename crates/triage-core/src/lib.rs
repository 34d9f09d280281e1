//! # triage-core
//!
//! Core types, traits, and abstractions for inbox triage.
//!
//! This crate provides the data model shared by the loader, the review
//! session and the inference client, together with the collaborator traits
//! the host application and the model server are reached through.

pub mod defaults;
pub mod env;
pub mod error;
pub mod models;
pub mod traits;
pub mod visibility;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use visibility::{Visibility, VisibilityWatch};
