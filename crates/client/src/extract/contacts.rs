//! Contact and product-listing extraction for per-domain harvesting.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,4}").expect("invalid email regex"));

/// Matches ending in these are asset names or placeholders, not addresses.
const EMAIL_BLACKLIST: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", "example.com"];

/// Contacts found on one or more pages of a site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contacts {
    pub emails: BTreeSet<String>,
    pub facebook: BTreeSet<String>,
    pub twitter: BTreeSet<String>,
}

impl Contacts {
    /// Fold another page's contacts into this set.
    pub fn merge(&mut self, other: Contacts) {
        self.emails.extend(other.emails);
        self.facebook.extend(other.facebook);
        self.twitter.extend(other.twitter);
    }
}

/// Lowercased e-mail addresses found anywhere in `text`.
pub fn extract_emails(text: &str) -> BTreeSet<String> {
    EMAIL
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| !EMAIL_BLACKLIST.iter().any(|suffix| email.ends_with(suffix)))
        .collect()
}

/// E-mail addresses plus Facebook and Twitter profile links of a page.
pub fn extract_contacts(html: &str) -> Contacts {
    let emails = extract_emails(html);

    let document = Html::parse_document(html);
    let selector = Selector::parse("[href]").expect("invalid selector");

    let mut contacts = Contacts { emails, ..Default::default() };
    for href in document.select(&selector).filter_map(|e| e.value().attr("href")) {
        if !(href.contains("facebook.com") || href.contains("twitter.com")) {
            continue;
        }
        if href.contains("facebook") {
            contacts.facebook.insert(href.to_string());
        } else {
            contacts.twitter.insert(href.to_string());
        }
    }

    contacts
}

/// Up to `limit` distinct root-relative `/products/` paths, in document order.
pub fn product_paths(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"a[href*="/products/"]"#).expect("invalid selector");

    let mut paths: Vec<String> = Vec::new();
    for href in document.select(&selector).filter_map(|e| e.value().attr("href")) {
        if paths.len() >= limit {
            break;
        }
        if href.starts_with('/') && !paths.iter().any(|p| p == href) {
            paths.push(href.to_string());
        }
    }
    paths
}
