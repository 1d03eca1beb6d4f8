//! Outbound link harvesting for the crawl frontier.

use scraper::{Html, Selector};
use url::Url;

use crate::fetch::{netloc, same_domain, strip_fragment, to_absolute};

/// Extract crawlable links from a parsed page, in document order.
///
/// Every `a[href]` target has its fragment stripped, empty values dropped,
/// and relative values resolved against `page_url`. When `scope` is set,
/// links whose host is not [`same_domain`] as `scope` are dropped.
/// Duplicates are kept; the frontier decides what is new.
pub fn extract_links(document: &Html, page_url: &str, scope: Option<&str>) -> Vec<String> {
    let selector = Selector::parse("a[href]").expect("invalid selector");

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(strip_fragment)
        .filter(|href| !href.trim().is_empty())
        .filter_map(|href| to_absolute(page_url, href).ok())
        .filter(|link| match scope {
            Some(domain) => Url::parse(link)
                .ok()
                .and_then(|u| netloc(&u))
                .is_some_and(|host| same_domain(&host, domain)),
            None => true,
        })
        .collect()
}
