//! Image reference harvesting.
//!
//! `TagOnly` looks at `<img src>` alone. `Extended` also reads icon links,
//! `og:image`-style meta tags, `url(...)` in inline styles and the `logo`
//! field of JSON-LD blocks.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::fetch::to_absolute;

static STYLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("invalid style regex"));

/// Which asset references a page handler harvests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssetMode {
    /// `<img src>` only.
    #[default]
    TagOnly,
    /// Images plus icons, meta previews, inline backgrounds and JSON-LD logos.
    Extended,
}

fn attr_values(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let selector = Selector::parse(selector).expect("invalid selector");
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

fn collect_logos(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_logos(item, out)),
        Value::Object(map) => {
            match map.get("logo") {
                Some(Value::String(logo)) => out.push(logo.clone()),
                Some(Value::Object(logo)) => {
                    if let Some(Value::String(url)) = logo.get("url") {
                        out.push(url.clone());
                    }
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_logos(graph, out);
            }
        }
        _ => {}
    }
}

/// Raw asset references of a page, in harvest order.
pub fn asset_references(document: &Html, mode: AssetMode) -> Vec<String> {
    let mut refs = attr_values(document, "img[src]", "src");

    if mode == AssetMode::Extended {
        refs.extend(attr_values(document, r#"link[rel*="icon"][href]"#, "href"));
        refs.extend(attr_values(document, r#"meta[property*="image"][content]"#, "content"));

        for style in attr_values(document, r#"[style*="image"]"#, "style") {
            refs.extend(STYLE_URL.captures_iter(&style).map(|c| c[1].trim().to_string()));
        }

        let scripts = Selector::parse(r#"script[type="application/ld+json"]"#).expect("invalid selector");
        for script in document.select(&scripts) {
            let text = script.text().collect::<String>();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => collect_logos(&value, &mut refs),
                Err(e) => tracing::debug!("skipping malformed JSON-LD block: {}", e),
            }
        }
    }

    refs
}

/// Absolute, de-duplicated asset URLs of a page, first occurrence wins.
pub fn extract_assets(document: &Html, page_url: &str, mode: AssetMode) -> Vec<String> {
    let mut seen = HashSet::new();
    asset_references(document, mode)
        .into_iter()
        .filter_map(|reference| to_absolute(page_url, &reference).ok())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head>
            <link rel="icon" href="/favicon.ico">
            <link rel="stylesheet" href="/site.css">
            <meta property="og:image" content="https://cdn.example.com/preview.jpg">
            <script type="application/ld+json">
                {"@context": "https://schema.org", "@type": "Organization", "logo": "/logo.png"}
            </script>
            <script type="application/ld+json">{ not json </script>
        </head>
        <body>
            <img src="/a.png">
            <img src="/a.png">
            <img alt="no source">
            <div style="background-image: url('/bg.jpg')"></div>
        </body>
        </html>
    "#;

    #[test]
    fn test_tag_only_mode() {
        let document = Html::parse_document(PAGE);
        let assets = extract_assets(&document, "https://example.com/", AssetMode::TagOnly);
        assert_eq!(assets, vec!["https://example.com/a.png"]);
    }

    #[test]
    fn test_extended_mode() {
        let document = Html::parse_document(PAGE);
        let assets = extract_assets(&document, "https://example.com/", AssetMode::Extended);
        assert_eq!(
            assets,
            vec![
                "https://example.com/a.png",
                "https://example.com/favicon.ico",
                "https://cdn.example.com/preview.jpg",
                "https://example.com/bg.jpg",
                "https://example.com/logo.png",
            ]
        );
    }

    #[test]
    fn test_references_keep_duplicates() {
        let document = Html::parse_document(PAGE);
        let refs = asset_references(&document, AssetMode::TagOnly);
        assert_eq!(refs, vec!["/a.png", "/a.png"]);
    }

    #[test]
    fn test_collect_logos_nested() {
        let value: Value = serde_json::from_str(
            r#"[
                {"logo": {"@type": "ImageObject", "url": "https://x.com/l1.png"}},
                {"@graph": [{"logo": "https://x.com/l2.png"}, {"name": "no logo"}]}
            ]"#,
        )
        .unwrap();

        let mut out = Vec::new();
        collect_logos(&value, &mut out);
        assert_eq!(out, vec!["https://x.com/l1.png", "https://x.com/l2.png"]);
    }

    #[test]
    fn test_style_url_variants() {
        let html = r#"
            <div style='background-image: url("/double.png")'></div>
            <span style="background-image:url(/bare.gif)"></span>
            <p style="color: red"></p>
        "#;
        let document = Html::parse_document(html);
        let assets = extract_assets(&document, "https://example.com/", AssetMode::Extended);
        assert_eq!(assets, vec!["https://example.com/double.png", "https://example.com/bare.gif"]);
    }
}
