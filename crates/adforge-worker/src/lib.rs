//! Background worker that keeps generation jobs moving.

pub mod config;
pub mod poller;

pub use config::PollerConfig;
pub use poller::JobPoller;
