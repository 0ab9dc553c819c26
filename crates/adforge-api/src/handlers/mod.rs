//! HTTP handlers.

pub mod generations;
pub mod health;

pub use health::{health, ready};
