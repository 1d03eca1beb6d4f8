//! Page handler that downloads a page's images into a content store.

use async_trait::async_trait;
use reqwest::StatusCode;
use sitecrawl_core::{ContentStore, Error, StoreOutcome};
use url::Url;

use super::handler::{Page, PageHandler};
use crate::extract::{AssetMode, extract_assets};
use crate::fetch::Fetch;

/// File suffixes accepted as images, compared case-insensitively.
const IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".gif", ".png", ".tif", ".svg", ".ico"];

/// Last path segment of an asset URL, if it names an image file.
fn image_file_name(asset_url: &str) -> Option<String> {
    let url = Url::parse(asset_url).ok()?;
    let name = url.path_segments()?.next_back()?.to_string();
    let lower = name.to_ascii_lowercase();
    IMAGE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)).then_some(name)
}

/// Running totals over all handled pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    /// New files written.
    pub stored: usize,
    /// Downloads whose payload was already in the store.
    pub duplicates: usize,
    /// References that are not images or did not answer 200.
    pub skipped: usize,
    /// Downloads or writes that failed.
    pub failed: usize,
}

/// Downloads every image referenced by a crawled page.
pub struct ImageCollector<F> {
    fetcher: F,
    store: ContentStore,
    mode: AssetMode,
    stats: ImageStats,
}

impl<F: Fetch> ImageCollector<F> {
    pub fn new(fetcher: F, store: ContentStore, mode: AssetMode) -> Self {
        Self { fetcher, store, mode, stats: ImageStats::default() }
    }

    pub fn stats(&self) -> ImageStats {
        self.stats
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    async fn collect(&mut self, asset_url: &str) {
        let Some(file_name) = image_file_name(asset_url) else {
            tracing::debug!("not an image: {}", asset_url);
            self.stats.skipped += 1;
            return;
        };

        let asset = match self.fetcher.fetch_asset(asset_url).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!("image download failed: {}", e);
                self.stats.failed += 1;
                return;
            }
        };

        if asset.status != StatusCode::OK {
            tracing::debug!("skipping {} ({})", asset_url, asset.status.as_u16());
            self.stats.skipped += 1;
            return;
        }

        match self.store.store(&file_name, &asset.bytes).await {
            Ok(stored) if stored.outcome == StoreOutcome::Written => {
                tracing::info!("Saved {} -> {}", asset_url, stored.path.display());
                self.stats.stored += 1;
            }
            Ok(stored) => {
                tracing::debug!("already stored as {}: {}", stored.path.display(), asset_url);
                self.stats.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(url = %asset_url, "failed to store image: {}", e);
                self.stats.failed += 1;
            }
        }
    }
}

#[async_trait]
impl<F: Fetch> PageHandler for ImageCollector<F> {
    async fn handle(&mut self, page: &Page) -> Result<(), Error> {
        tracing::info!("Crawling: {}", page.url);

        let assets = extract_assets(&page.document(), &page.url, self.mode);
        for asset_url in assets {
            self.collect(&asset_url).await;
        }
        Ok(())
    }
}
