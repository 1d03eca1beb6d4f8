//! Page cache operations.
//!
//! Stores are append-only; reads pick the newest row for a (domain, url)
//! pair and lazily delete it once it has outlived the cache TTL.

use super::connection::ResponseCache;
use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Fixed-width RFC 3339 so that lexical order in SQLite matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("stored_at {raw:?}: {e}")))
}

impl ResponseCache {
    /// Get the cached content for a domain and url.
    ///
    /// Returns None if nothing is stored or the newest entry has expired. An
    /// expired entry is deleted before returning.
    pub async fn get(&self, domain: &str, url: &str) -> Result<Option<String>, Error> {
        self.lookup(domain, url, Utc::now()).await
    }

    pub(crate) async fn lookup(&self, domain: &str, url: &str, now: DateTime<Utc>) -> Result<Option<String>, Error> {
        let domain = domain.to_string();
        let url = url.to_string();
        let ttl = self.ttl;

        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT content, stored_at FROM pages
                     WHERE domain = ?1 AND url = ?2
                     ORDER BY stored_at DESC, id DESC
                     LIMIT 1",
                )?;

                let result = stmt.query_row(params![domain, url], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                });

                let (content, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let stored_at = parse_timestamp(&stored_at)?;
                let expired = ttl <= chrono::Duration::zero() || now - stored_at > ttl;

                if expired {
                    conn.execute("DELETE FROM pages WHERE domain = ?1 AND url = ?2", params![domain, url])?;
                    tracing::debug!(%domain, %url, "evicted expired cache entry");
                    return Ok(None);
                }

                Ok(Some(content))
            })
            .await
            .map_err(Error::from)
    }

    /// Store the content for a domain and url.
    ///
    /// Always appends a new row; the statement is committed before returning.
    pub async fn set(&self, domain: &str, url: &str, content: &str) -> Result<(), Error> {
        self.insert_at(domain, url, content, Utc::now()).await
    }

    pub(crate) async fn insert_at(
        &self, domain: &str, url: &str, content: &str, stored_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let domain = domain.to_string();
        let url = url.to_string();
        let content = content.to_string();
        let stored_at = format_timestamp(stored_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO pages (domain, url, content, stored_at) VALUES (?1, ?2, ?3, ?4)",
                    params![domain, url, content, stored_at],
                )?;
                tracing::debug!(%domain, %url, "cached page");
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every stored row for a domain and url.
    pub async fn delete(&self, domain: &str, url: &str) -> Result<(), Error> {
        let domain = domain.to_string();
        let url = url.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM pages WHERE domain = ?1 AND url = ?2", params![domain, url])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List the distinct URLs stored for a domain, in first-stored order.
    pub async fn list_urls(&self, domain: &str) -> Result<Vec<String>, Error> {
        let domain = domain.to_string();

        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url FROM pages WHERE domain = ?1
                     GROUP BY url
                     ORDER BY MIN(id)",
                )?;
                let urls = stmt
                    .query_map(params![domain], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry older than the TTL.
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let cutoff = format_timestamp(Utc::now() - self.ttl.max(chrono::Duration::zero()));

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM pages WHERE stored_at <= ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry stored under a domain.
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_domain(&self, domain: &str) -> Result<u64, Error> {
        let domain = domain.to_string();

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM pages WHERE domain = ?1", params![domain])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ResponseCache {
    /// Drop the pages table so that every later read or write fails.
    pub async fn drop_pages_table(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| -> Result<(), Error> {
                conn.execute_batch("DROP TABLE pages")?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn cache(ttl: Duration) -> ResponseCache {
        ResponseCache::open_in_memory(ttl).await.unwrap()
    }

    async fn row_count(cache: &ResponseCache) -> i64 {
        cache
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = cache(Duration::days(7)).await;
        cache.set("example.com", "http://example.com/", "<html>home</html>").await.unwrap();

        let content = cache.get("example.com", "http://example.com/").await.unwrap();
        assert_eq!(content.as_deref(), Some("<html>home</html>"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = cache(Duration::days(7)).await;
        assert!(cache.get("example.com", "http://example.com/nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_are_partitioned_by_domain() {
        let cache = cache(Duration::days(7)).await;
        cache.set("a.com", "http://a.com/", "a").await.unwrap();

        assert!(cache.get("b.com", "http://a.com/").await.unwrap().is_none());
        assert!(cache.get("", "http://a.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let cache = cache(Duration::days(7)).await;
        let url = "http://example.com/about";
        cache.set("example.com", url, "about").await.unwrap();

        let later = Utc::now() + Duration::days(7) + Duration::seconds(1);
        assert!(cache.lookup("example.com", url, later).await.unwrap().is_none());

        let urls = cache.list_urls("example.com").await.unwrap();
        assert!(!urls.contains(&url.to_string()));
        assert_eq!(row_count(&cache).await, 0);
    }

    #[tokio::test]
    async fn test_entry_within_ttl_is_kept() {
        let cache = cache(Duration::days(7)).await;
        cache.set("example.com", "http://example.com/", "home").await.unwrap();

        let later = Utc::now() + Duration::days(6);
        let content = cache.lookup("example.com", "http://example.com/", later).await.unwrap();
        assert_eq!(content.as_deref(), Some("home"));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_always_expired() {
        let cache = cache(Duration::zero()).await;
        cache.set("example.com", "http://example.com/", "home").await.unwrap();
        assert!(cache.get("example.com", "http://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_negative_ttl_is_always_expired() {
        let cache = cache(Duration::days(-1)).await;
        cache.set("example.com", "http://example.com/", "home").await.unwrap();
        assert!(cache.get("example.com", "http://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_appends_and_get_returns_newest() {
        let cache = cache(Duration::days(7)).await;
        let url = "http://example.com/";
        let now = Utc::now();
        cache.insert_at("example.com", url, "old", now - Duration::hours(2)).await.unwrap();
        cache.insert_at("example.com", url, "new", now - Duration::hours(1)).await.unwrap();
        cache.insert_at("example.com", url, "older", now - Duration::hours(3)).await.unwrap();

        assert_eq!(row_count(&cache).await, 3);
        assert_eq!(cache.get("example.com", url).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_expiry_removes_all_stale_rows() {
        let cache = cache(Duration::days(1)).await;
        let url = "http://example.com/";
        let past = Utc::now() - Duration::days(3);
        cache.insert_at("example.com", url, "v1", past).await.unwrap();
        cache.insert_at("example.com", url, "v2", past + Duration::hours(1)).await.unwrap();

        assert!(cache.get("example.com", url).await.unwrap().is_none());
        assert_eq!(row_count(&cache).await, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = cache(Duration::days(7)).await;
        cache.set("example.com", "http://example.com/a", "a").await.unwrap();
        cache.set("example.com", "http://example.com/b", "b").await.unwrap();

        cache.delete("example.com", "http://example.com/a").await.unwrap();

        assert!(cache.get("example.com", "http://example.com/a").await.unwrap().is_none());
        assert!(cache.get("example.com", "http://example.com/b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_urls_distinct_in_store_order() {
        let cache = cache(Duration::days(7)).await;
        cache.set("example.com", "http://example.com/b", "b").await.unwrap();
        cache.set("example.com", "http://example.com/a", "a").await.unwrap();
        cache.set("example.com", "http://example.com/b", "b2").await.unwrap();
        cache.set("other.com", "http://other.com/", "o").await.unwrap();

        let urls = cache.list_urls("example.com").await.unwrap();
        assert_eq!(urls, vec!["http://example.com/b", "http://example.com/a"]);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = cache(Duration::days(1)).await;
        cache
            .insert_at("example.com", "http://example.com/old", "old", Utc::now() - Duration::days(2))
            .await
            .unwrap();
        cache.set("example.com", "http://example.com/fresh", "fresh").await.unwrap();

        let deleted = cache.purge_expired().await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(cache.list_urls("example.com").await.unwrap(), vec!["http://example.com/fresh"]);
    }

    #[tokio::test]
    async fn test_purge_domain() {
        let cache = cache(Duration::days(7)).await;
        cache.set("a.com", "http://a.com/", "a").await.unwrap();
        cache.set("a.com", "http://a.com/x", "x").await.unwrap();
        cache.set("b.com", "http://b.com/", "b").await.unwrap();

        assert_eq!(cache.purge_domain("a.com").await.unwrap(), 2);
        assert!(cache.list_urls("a.com").await.unwrap().is_empty());
        assert_eq!(cache.list_urls("b.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_reported() {
        let cache = cache(Duration::days(7)).await;
        cache
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO pages (domain, url, content, stored_at) VALUES ('d', 'u', 'c', 'yesterday')",
                    [],
                )
            })
            .await
            .unwrap();

        let result = cache.get("d", "u").await;
        assert!(matches!(result, Err(Error::CorruptEntry(_))));
    }

    #[test]
    fn test_timestamp_format_is_sortable() {
        let early = format_timestamp(Utc::now());
        let late = format_timestamp(Utc::now() + Duration::milliseconds(5));
        assert!(early < late);
        assert_eq!(parse_timestamp(&early).unwrap().to_rfc3339_opts(SecondsFormat::Micros, true), early);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let cache = cache(Duration::days(7)).await;
        cache.drop_pages_table().await.unwrap();

        let stored = cache.set("a.com", "http://a.com/", "a").await;
        assert!(matches!(stored, Err(Error::Database(_))), "got {stored:?}");

        let read = cache.get("a.com", "http://a.com/").await;
        assert!(matches!(read, Err(Error::Database(_))), "got {read:?}");
    }
}
