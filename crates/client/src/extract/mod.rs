//! Data extraction from parsed HTML.
//!
//! - `links`: outbound hyperlinks that feed the crawl frontier
//! - `assets`: image references for the image-collecting page handler
//! - `contacts`: e-mails, social profiles and product listings for harvesting

pub mod assets;
pub mod contacts;
pub mod links;

pub use assets::{AssetMode, asset_references, extract_assets};
pub use contacts::{Contacts, extract_contacts, extract_emails, product_paths};
pub use links::extract_links;
