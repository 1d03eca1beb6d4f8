//! SQLite-backed response cache for crawled pages.
//!
//! This module provides a persistent cache of fetched HTML keyed by
//! (domain, url), using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Append-only stores with newest-row reads
//! - Time-to-live eviction on read
//! - Automatic schema migrations
//! - Synchronous commits so a stored page survives a crash

pub mod connection;
pub mod migrations;
pub mod pages;

pub use crate::Error;

pub use connection::{DEFAULT_TTL_DAYS, ResponseCache};
