//! PostgREST-backed persistence for generation jobs.
//!
//! Talks to Supabase's REST surface with the service-role key. Conditional
//! status transitions are expressed as filtered PATCH requests, so a write
//! that lost a race returns no rows instead of clobbering newer state.

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod retry;

pub use client::{PostgrestClient, PostgrestConfig};
pub use error::{StoreError, StoreResult};
pub use repos::{GenerationRepository, JobUpdate, ProviderKeyRepository};
pub use retry::RetryConfig;
