//! Concurrent per-domain harvesting.
//!
//! A fixed number of workers drain one shared FIFO queue. Each worker owns
//! its own fetcher and finishes a domain before taking the next. Results are
//! put back into input order once every worker has been joined.

pub mod contacts;
pub mod records;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use sitecrawl_core::{AppConfig, Error};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::fetch::{FetchConfig, Fetcher};

pub use contacts::{ContactHarvester, ContactRecord, Product, SUB_PAGES};
pub use records::{load_work_items, work_item_domain, write_records};

/// Shared FIFO of `(input position, domain)` pairs.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<(usize, String)>>,
}

impl WorkQueue {
    pub fn new(domains: impl IntoIterator<Item = String>) -> Self {
        Self { items: Mutex::new(domains.into_iter().enumerate().collect()) }
    }

    /// Take the next item, or `None` once the queue is drained.
    pub async fn pop(&self) -> Option<(usize, String)> {
        self.items.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

/// Fixed-size pool of harvesting workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    product_limit: usize,
    fetch: FetchConfig,
}

impl WorkerPool {
    pub fn new(workers: usize, product_limit: usize, fetch: FetchConfig) -> Self {
        Self { workers, product_limit, fetch }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.workers, config.product_limit, FetchConfig::from(config))
    }

    /// Harvest every domain and return one record per domain, in input order.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if the pool has zero workers or a fetcher
    ///   cannot be built
    /// - `Error::WorkerFailed` if a worker task panics
    pub async fn run(&self, domains: Vec<String>) -> Result<Vec<ContactRecord>, Error> {
        if self.workers == 0 {
            return Err(Error::InvalidInput("worker count must be at least 1".to_string()));
        }

        let total = domains.len();
        let queue = Arc::new(WorkQueue::new(domains));
        let spawned = self.workers.min(total);
        let start = Instant::now();

        tracing::info!("harvesting {} domains with {} workers", total, spawned);

        let mut tasks = JoinSet::new();
        for id in 0..spawned {
            let harvester = ContactHarvester::new(Fetcher::new(self.fetch.clone())?, self.product_limit);
            let queue = Arc::clone(&queue);
            tasks.spawn(async move {
                let mut done = Vec::new();
                while let Some((position, domain)) = queue.pop().await {
                    tracing::debug!(worker = id, "harvesting {}", domain);
                    done.push((position, harvester.harvest(&domain).await));
                }
                done
            });
        }

        let mut slots: Vec<Option<ContactRecord>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let done = joined.map_err(|e| Error::WorkerFailed(e.to_string()))?;
            for (position, record) in done {
                slots[position] = Some(record);
            }
        }

        let records: Vec<ContactRecord> = slots.into_iter().flatten().collect();
        tracing::info!("harvested {} domains in {}ms", records.len(), start.elapsed().as_millis());

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Contacts;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pool(workers: usize, product_limit: usize) -> WorkerPool {
        let fetch = FetchConfig { timeout: Duration::from_secs(5), ..Default::default() };
        WorkerPool::new(workers, product_limit, fetch)
    }

    #[tokio::test]
    async fn test_work_queue_fifo() {
        let queue = WorkQueue::new(vec!["a.com".to_string(), "b.com".to_string()]);
        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pop().await, Some((0, "a.com".to_string())));
        assert_eq!(queue.pop().await, Some((1, "b.com".to_string())));
        assert_eq!(queue.pop().await, None);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let result = pool(0, 5).run(vec!["a.com".to_string()]).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let records = pool(4, 5).run(Vec::new()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_domains_without_content_yield_empty_records() {
        // Both servers answer 404 to everything.
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        let domains = vec![first.address().to_string(), second.address().to_string()];

        let records = pool(2, 3).run(domains.clone()).await.unwrap();

        assert_eq!(records.len(), 2);
        for (record, domain) in records.iter().zip(&domains) {
            assert_eq!(&record.url, domain);
            assert_eq!(record.contacts, Contacts::default());
            assert_eq!(record.products, vec![Product::default(); 3]);
        }
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let mut servers = Vec::new();
        for i in 0..5 {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_raw(format!("<p>owner{i}@shop.io</p>"), "text/html")
                        .set_delay(Duration::from_millis(50 * (5 - i as u64))),
                )
                .mount(&server)
                .await;
            servers.push(server);
        }
        let domains: Vec<String> = servers.iter().map(|s| s.address().to_string()).collect();

        let records = pool(3, 1).run(domains.clone()).await.unwrap();

        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, domains.iter().map(String::as_str).collect::<Vec<_>>());
        for (i, record) in records.iter().enumerate() {
            assert!(record.contacts.emails.contains(&format!("owner{i}@shop.io")));
        }
    }

    #[tokio::test]
    async fn test_more_workers_than_domains() {
        let server = MockServer::start().await;
        let records = pool(40, 2).run(vec![server.address().to_string()]).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
