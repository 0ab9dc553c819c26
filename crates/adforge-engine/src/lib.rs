//! Generation job lifecycle engine.
//!
//! The [`Orchestrator`] sits between the HTTP surface and the vendor
//! adapters: it validates requests, persists job rows, drives the
//! `queued -> processing -> {completed|failed}` state machine, and hands
//! finished assets to durable storage.

pub mod config;
pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod traits;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use keys::{EnvKeyResolver, StoredKeyResolver};
pub use orchestrator::Orchestrator;
pub use traits::{AssetSink, JobStore, KeyResolver};
