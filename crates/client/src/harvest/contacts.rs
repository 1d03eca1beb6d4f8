//! Per-domain contact and product harvesting.

use serde::Deserialize;

use crate::extract::{Contacts, extract_contacts, product_paths};
use crate::fetch::Fetch;

/// Paths probed for contact details, relative to the domain root.
pub const SUB_PAGES: &[&str] = &["", "about", "about-us", "contact", "contact-us"];

/// Listing page that links to individual products.
const PRODUCT_LISTING: &str = "collections/all";

/// One product slot of a record. Empty when the detail could not be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    pub title: String,
    pub image: String,
}

/// Everything harvested for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    /// The domain as given in the work item.
    pub url: String,
    pub contacts: Contacts,
    /// Exactly `product_limit` slots.
    pub products: Vec<Product>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: ProductDetail,
}

#[derive(Deserialize)]
struct ProductDetail {
    #[serde(default)]
    title: String,
    #[serde(default)]
    image: Option<ProductImage>,
}

#[derive(Deserialize)]
struct ProductImage {
    #[serde(default)]
    src: String,
}

fn parse_product(body: &str) -> Product {
    match serde_json::from_str::<ProductEnvelope>(body) {
        Ok(envelope) => Product {
            title: envelope.product.title,
            image: envelope.product.image.map(|i| i.src).unwrap_or_default(),
        },
        Err(e) => {
            tracing::debug!("undecodable product detail: {}", e);
            Product::default()
        }
    }
}

/// Harvests one domain at a time with its own fetcher.
pub struct ContactHarvester<F> {
    fetcher: F,
    product_limit: usize,
}

impl<F: Fetch> ContactHarvester<F> {
    pub fn new(fetcher: F, product_limit: usize) -> Self {
        Self { fetcher, product_limit }
    }

    /// Probe the contact pages and product listing of `domain`.
    ///
    /// Never fails: unreachable pages are skipped and an unreachable domain
    /// yields an empty record.
    pub async fn harvest(&self, domain: &str) -> ContactRecord {
        let mut contacts = Contacts::default();
        for sub in SUB_PAGES {
            if let Some(body) = self.get_text(&format!("http://{domain}/{sub}")).await {
                contacts.merge(extract_contacts(&body));
            }
        }

        let products = self.products(domain).await;

        ContactRecord { url: domain.to_string(), contacts, products }
    }

    async fn products(&self, domain: &str) -> Vec<Product> {
        let mut products = Vec::with_capacity(self.product_limit);

        if let Some(listing) = self.get_text(&format!("http://{domain}/{PRODUCT_LISTING}")).await {
            for path in product_paths(&listing, self.product_limit) {
                if let Some(body) = self.get_text(&format!("http://{domain}{path}.json")).await {
                    products.push(parse_product(&body));
                }
            }
        }

        products.resize_with(self.product_limit, Product::default);
        products
    }

    /// Body text of a successful response, or `None`.
    async fn get_text(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch_asset(url).await {
            Ok(asset) if asset.status.is_success() => Some(String::from_utf8_lossy(&asset.bytes).into_owned()),
            Ok(asset) => {
                tracing::debug!("{} returned {}", url, asset.status.as_u16());
                None
            }
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }
}
