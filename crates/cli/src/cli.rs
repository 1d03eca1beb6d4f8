//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sitecrawl", version, about = "Crawl websites, collect images and harvest store contacts")]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by commands that run the crawl engine.
#[derive(Args, Debug, Clone)]
pub struct CrawlArgs {
    /// Start URL
    pub url: String,

    /// Maximum number of pages to visit
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Follow links to any domain
    #[arg(long)]
    pub all_domains: bool,

    /// Ignore cached pages and fetch everything again
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl a site breadth-first and log every page
    Crawl {
        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Crawl a site and download its images
    Images {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Directory images are written to
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Also collect icons, preview images, inline backgrounds and logos
        #[arg(long)]
        extended: bool,
    },

    /// Harvest contacts and products for every domain in a CSV file
    Contacts {
        /// CSV file with a `url` column
        #[arg(long, default_value = "stores.csv")]
        input: PathBuf,

        /// CSV file to write records to
        #[arg(long, default_value = "output.csv")]
        output: PathBuf,

        /// Number of concurrent workers
        #[arg(long)]
        workers: Option<usize>,

        /// Product slots per domain
        #[arg(long)]
        products: Option<usize>,
    },

    /// Inspect or clean the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached URLs of a domain
    List {
        /// Domain the pages were cached under
        domain: String,
    },

    /// Remove expired pages, or every page of one domain
    Purge {
        #[arg(long)]
        domain: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_crawl() {
        let cli = Cli::parse_from(["sitecrawl", "crawl", "https://shop.io", "--max-pages", "3", "--no-cache"]);
        let Command::Crawl { crawl } = cli.command else {
            panic!("expected crawl command");
        };
        assert_eq!(crawl.url, "https://shop.io");
        assert_eq!(crawl.max_pages, Some(3));
        assert!(crawl.no_cache);
        assert!(!crawl.all_domains);
    }

    #[test]
    fn test_parse_images() {
        let cli = Cli::parse_from(["sitecrawl", "--json", "images", "https://shop.io", "--dir", "out", "--extended"]);
        assert!(cli.json);
        let Command::Images { crawl, dir, extended } = cli.command else {
            panic!("expected images command");
        };
        assert_eq!(crawl.url, "https://shop.io");
        assert_eq!(dir, Some(PathBuf::from("out")));
        assert!(extended);
    }

    #[test]
    fn test_parse_contacts_defaults() {
        let cli = Cli::parse_from(["sitecrawl", "contacts"]);
        let Command::Contacts { input, output, workers, products } = cli.command else {
            panic!("expected contacts command");
        };
        assert_eq!(input, PathBuf::from("stores.csv"));
        assert_eq!(output, PathBuf::from("output.csv"));
        assert!(workers.is_none());
        assert!(products.is_none());
    }

    #[test]
    fn test_parse_cache_purge() {
        let cli = Cli::parse_from(["sitecrawl", "cache", "purge", "--domain", "shop.io"]);
        assert!(matches!(
            cli.command,
            Command::Cache { action: CacheAction::Purge { domain: Some(ref d) } } if d == "shop.io"
        ));
    }
}
