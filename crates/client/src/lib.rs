//! Network-facing code for sitecrawl.
//!
//! This crate provides the HTTP fetcher, HTML extraction, the breadth-first
//! crawl engine with its page handlers, and the concurrent contact harvester
//! shared by the CLI.

pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod harvest;

pub use crawl::{
    CrawlConfig, CrawlReport, CrawlStatus, Crawler, ImageCollector, ImageStats, LogHandler, Page, PageHandler,
};
pub use extract::{AssetMode, Contacts, extract_assets, extract_links};
pub use fetch::{Fetch, FetchConfig, FetchError, FetchedAsset, Fetcher};
pub use harvest::{ContactHarvester, ContactRecord, Product, WorkQueue, WorkerPool, load_work_items, write_records};
