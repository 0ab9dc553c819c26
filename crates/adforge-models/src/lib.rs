//! Shared data models for the AdForge generation backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation jobs and their lifecycle status
//! - Provider identifiers and model aliases
//! - Aspect ratios and audio configuration
//! - Generation request payloads

pub mod job;
pub mod media;
pub mod provider;
pub mod request;

// Re-export common types
pub use job::{GenerationJob, JobId, JobStatus, MediaKind};
pub use media::{AspectRatio, AspectRatioParseError, AudioConfig};
pub use provider::{ProviderId, ProviderIdParseError};
pub use request::GenerationRequest;
