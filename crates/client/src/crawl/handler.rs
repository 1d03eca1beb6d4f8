//! Pluggable per-page processing.

use async_trait::async_trait;
use scraper::Html;
use sitecrawl_core::Error;

/// A successfully fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub html: String,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: url.into(), html: html.into() }
    }

    /// Parse the page body.
    ///
    /// Every call parses the HTML again, so a page seen by both the engine
    /// and an extracting handler is parsed twice. The parsed tree is not
    /// `Send`; keep it out of `.await` points.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// Processing capability injected into the crawl engine.
#[async_trait]
pub trait PageHandler: Send {
    /// Process one crawled page.
    ///
    /// Errors are logged by the engine and never stop the crawl.
    async fn handle(&mut self, page: &Page) -> Result<(), Error>;
}

/// Default handler: log the page and do nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

#[async_trait]
impl PageHandler for LogHandler {
    async fn handle(&mut self, page: &Page) -> Result<(), Error> {
        tracing::info!("Crawling: {}", page.url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_page_document() {
        let page = Page::new("https://example.com/", "<html><head><title>Hi</title></head></html>");
        let document = page.document();
        let title = Selector::parse("title").unwrap();
        let text: String = document.select(&title).flat_map(|t| t.text()).collect();
        assert_eq!(text, "Hi");
    }

    #[tokio::test]
    async fn test_log_handler_succeeds() {
        let mut handler = LogHandler;
        let page = Page::new("https://example.com/", "");
        assert!(handler.handle(&page).await.is_ok());
    }
}
