//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying the pragmas that
//! make every commit durable, and running migrations.

use super::migrations;
use crate::Error;
use chrono::Duration;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Default time-to-live for cached pages.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// `synchronous=FULL` makes every autocommit fsync before returning.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=FULL;
     PRAGMA temp_store=MEMORY;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread, together with the entry time-to-live.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    pub(crate) conn: Connection,
    pub(crate) ttl: Duration,
}

impl ResponseCache {
    /// Open a cache database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, ttl).await
    }

    /// Open an in-memory cache for testing.
    pub async fn open_in_memory(ttl: Duration) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, ttl).await
    }

    async fn init(conn: Connection, ttl: Duration) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        tracing::debug!(ttl_secs = ttl.num_seconds(), "response cache ready");

        Ok(Self { conn, ttl })
    }

    /// The configured entry time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
