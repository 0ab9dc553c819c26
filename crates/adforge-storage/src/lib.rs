//! Durable asset storage on Cloudflare R2.

pub mod client;
pub mod error;
pub mod persister;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use persister::{asset_key, AssetPersister};
