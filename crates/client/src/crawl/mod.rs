//! Breadth-first crawl engine.
//!
//! ### Traversal
//! - FIFO frontier seeded with the start URL.
//! - Each popped URL is resolved through the response cache (if attached)
//!   or the fetcher, handed to the page handler, then mined for links.
//! - A link is enqueued only if neither its `http` nor its `https` spelling
//!   has been visited, queued or rejected in this run.
//!
//! ### Termination
//! - `Done` when the frontier drains.
//! - `BudgetReached` when `max_pages` pages have been handled.
//!
//! ### Failures
//! - `UnsupportedScheme` and `NotHtml` count as failed pages.
//! - `TransportFailure` is logged and skipped without counting.
//! - Page handler errors are logged and skipped.
//! - Cache storage errors abort the crawl.

pub mod handler;
pub mod images;

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use sitecrawl_core::{AppConfig, Error, ResponseCache};
use url::Url;

use crate::extract::extract_links;
use crate::fetch::{Fetch, FetchError, is_duplicate, netloc, strip_fragment};

pub use handler::{LogHandler, Page, PageHandler};
pub use images::{ImageCollector, ImageStats};

/// Lifecycle of one crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Idle,
    Running,
    Done,
    BudgetReached,
}

/// Crawl settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum number of pages handed to the page handler (default: 50)
    pub max_pages: usize,

    /// Only follow links within the start page's domain (default: true)
    pub single_domain: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { max_pages: 50, single_domain: true }
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self { max_pages: config.max_pages, single_domain: config.single_domain }
    }
}

/// Summary of a finished crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub status: CrawlStatus,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    /// Handled pages in visit order.
    pub visited: Vec<String>,
}

/// Mutable state of a single run, owned by the control loop.
struct CrawlState {
    domain: Option<String>,
    page_budget: usize,
    visited: Vec<String>,
    visited_index: HashSet<String>,
    frontier: VecDeque<String>,
    queued: HashSet<String>,
    rejected: HashSet<String>,
    pages_crawled: usize,
    pages_failed: usize,
    status: CrawlStatus,
}

impl CrawlState {
    fn new(domain: Option<String>, page_budget: usize) -> Self {
        Self {
            domain,
            page_budget,
            visited: Vec::new(),
            visited_index: HashSet::new(),
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            rejected: HashSet::new(),
            pages_crawled: 0,
            pages_failed: 0,
            status: CrawlStatus::Idle,
        }
    }

    fn has_budget(&self) -> bool {
        self.pages_crawled < self.page_budget
    }

    fn is_known(&self, url: &str) -> bool {
        is_duplicate(url, |u| {
            self.visited_index.contains(u) || self.queued.contains(u) || self.rejected.contains(u)
        })
    }

    fn enqueue(&mut self, url: String) {
        if self.is_known(&url) {
            return;
        }
        self.queued.insert(url.clone());
        self.frontier.push_back(url);
    }

    fn pop(&mut self) -> Option<String> {
        let url = self.frontier.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    fn mark_visited(&mut self, url: &str) {
        self.visited_index.insert(url.to_string());
        self.visited.push(url.to_string());
        self.pages_crawled += 1;
    }

    fn into_report(self) -> CrawlReport {
        CrawlReport {
            status: self.status,
            pages_crawled: self.pages_crawled,
            pages_failed: self.pages_failed,
            visited: self.visited,
        }
    }
}

/// Breadth-first crawler with an injected fetcher and page handler.
pub struct Crawler<F, H> {
    fetcher: F,
    handler: H,
    cache: Option<ResponseCache>,
    config: CrawlConfig,
}

impl<F: Fetch, H: PageHandler> Crawler<F, H> {
    pub fn new(fetcher: F, handler: H, config: CrawlConfig) -> Self {
        Self { fetcher, handler, cache: None, config }
    }

    /// Serve pages from, and store fetched pages into, `cache`.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Crawl breadth-first from `start_url`.
    ///
    /// With `bypass_cache` set, cached pages are ignored and every page is
    /// fetched again; fresh results still refresh the cache.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` if `start_url` cannot be parsed
    /// - `Error::Database` (or another cache error) if the cache fails
    pub async fn crawl(&mut self, start_url: &str, bypass_cache: bool) -> Result<CrawlReport, Error> {
        let start_url = strip_fragment(start_url.trim());
        let start = Url::parse(start_url).map_err(|e| Error::InvalidUrl(format!("{start_url}: {e}")))?;
        let domain = if self.config.single_domain { netloc(&start) } else { None };

        let mut state = CrawlState::new(domain, self.config.max_pages);
        state.enqueue(start_url.to_string());
        state.status = CrawlStatus::Running;

        tracing::info!(start = %start_url, domain = ?state.domain, budget = state.page_budget, "crawl started");

        while state.has_budget() {
            let Some(url) = state.pop() else {
                break;
            };

            let html = match self.resolve(state.domain.as_deref(), &url, bypass_cache).await? {
                Ok(html) => html,
                Err(e @ FetchError::TransportFailure { .. }) => {
                    tracing::error!("{}", e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("FAILED: {}", e);
                    state.pages_failed += 1;
                    state.rejected.insert(url);
                    continue;
                }
            };

            state.mark_visited(&url);
            let page = Page::new(url, html);

            if let Err(e) = self.handler.handle(&page).await {
                tracing::warn!(url = %page.url, "page handler failed: {}", e);
            }

            if !state.has_budget() {
                tracing::info!("The maximum number of pages has been reached.");
                state.status = CrawlStatus::BudgetReached;
                break;
            }

            let links = extract_links(&page.document(), &page.url, state.domain.as_deref());
            for link in links {
                state.enqueue(link);
            }
        }

        if state.status == CrawlStatus::Running {
            state.status = if state.frontier.is_empty() { CrawlStatus::Done } else { CrawlStatus::BudgetReached };
        }

        tracing::info!("{} pages crawled, {} links failed.", state.pages_crawled, state.pages_failed);

        Ok(state.into_report())
    }

    /// Cache-or-network page resolution.
    ///
    /// The outer error is a cache failure; the inner one a per-URL fetch failure.
    async fn resolve(
        &self, domain: Option<&str>, url: &str, bypass_cache: bool,
    ) -> Result<Result<String, FetchError>, Error> {
        let Some(cache) = &self.cache else {
            return Ok(self.fetcher.fetch_html(url).await);
        };
        let key = domain.unwrap_or_default();

        if !bypass_cache && let Some(html) = cache.get(key, url).await? {
            tracing::debug!("Cached url [{}] {}", key, url);
            return Ok(Ok(html));
        }

        let fetched = self.fetcher.fetch_html(url).await;
        if let Ok(html) = &fetched {
            cache.set(key, url, html).await?;
        }
        Ok(fetched)
    }
}
