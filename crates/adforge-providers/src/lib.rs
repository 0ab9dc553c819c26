//! Generation provider adapters.
//!
//! One adapter per external vendor (Sora, Veo, Runway, Kling, Gemini image),
//! all behind the [`GenerationProvider`] contract, plus a deterministic
//! [`FakeProvider`] for tests and development. Adapters are looked up through
//! a [`ProviderRegistry`] constructed once at process start.

pub mod adapter;
pub mod error;
pub mod fake;
pub mod gemini;
pub mod kling;
pub mod registry;
pub mod runway;
pub mod sora;
pub mod veo;

pub use adapter::{
    is_mock_job_id, mock_job_id, GenerationPhase, GenerationProvider, ProviderOptions,
    StatusReport,
};
pub use error::{ProviderError, ProviderResult};
pub use fake::FakeProvider;
pub use gemini::GeminiImageProvider;
pub use kling::KlingProvider;
pub use registry::ProviderRegistry;
pub use runway::RunwayProvider;
pub use sora::SoraProvider;
pub use veo::VeoProvider;
