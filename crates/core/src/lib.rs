//! Core types and shared functionality for sitecrawl.
//!
//! This crate provides:
//! - Response cache with SQLite backend
//! - Content-addressed asset store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

pub use cache::ResponseCache;
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{ContentStore, StoreOutcome, StoredAsset};
