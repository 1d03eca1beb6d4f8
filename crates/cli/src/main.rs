//! sitecrawl command-line entry point.
//!
//! Logging goes to stderr; command results (reports, cached URLs) go to stdout.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use sitecrawl_client::{
    AssetMode, CrawlConfig, CrawlReport, Crawler, FetchConfig, Fetcher, ImageCollector, LogHandler, PageHandler,
    WorkerPool, load_work_items, write_records,
};
use sitecrawl_core::{AppConfig, ContentStore, ResponseCache};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{CacheAction, Cli, Command, CrawlArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let mut config = AppConfig::load()?;
    let start = Instant::now();

    match cli.command {
        Command::Crawl { crawl } => {
            apply_crawl_args(&mut config, &crawl)?;
            let fetcher = Fetcher::new(FetchConfig::from(&config))?;
            let (report, _) = run_crawl(&config, &crawl, fetcher, LogHandler).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Images { crawl, dir, extended } => {
            apply_crawl_args(&mut config, &crawl)?;
            if let Some(dir) = dir {
                config.image_dir = dir;
            }

            let fetcher = Fetcher::new(FetchConfig::from(&config))?;
            let store = ContentStore::open(&config.image_dir).await?;
            let mode = if extended { AssetMode::Extended } else { AssetMode::TagOnly };
            let collector = ImageCollector::new(fetcher.clone(), store, mode);

            let (report, collector) = run_crawl(&config, &crawl, fetcher, collector).await?;
            let stats = collector.stats();
            tracing::info!(
                stored = stats.stored,
                duplicates = stats.duplicates,
                skipped = stats.skipped,
                failed = stats.failed,
                "images saved to {}",
                config.image_dir.display()
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Contacts { input, output, workers, products } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(products) = products {
                config.product_limit = products;
            }
            config.validate()?;

            let domains = load_work_items(&input)?;
            let records = WorkerPool::from_config(&config).run(domains).await?;
            write_records(&output, &records)?;
        }
        Command::Cache { action } => {
            let cache = ResponseCache::open(&config.db_path, config.cache_ttl()).await?;
            match action {
                CacheAction::List { domain } => {
                    for url in cache.list_urls(&domain).await? {
                        println!("{url}");
                    }
                }
                CacheAction::Purge { domain: Some(domain) } => {
                    let removed = cache.purge_domain(&domain).await?;
                    tracing::info!("removed {} cached pages for {}", removed, domain);
                }
                CacheAction::Purge { domain: None } => {
                    let removed = cache.purge_expired().await?;
                    tracing::info!("removed {} expired cached pages", removed);
                }
            }
        }
    }

    tracing::info!("Elapsed time: {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn apply_crawl_args(config: &mut AppConfig, args: &CrawlArgs) -> Result<()> {
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if args.all_domains {
        config.single_domain = false;
    }
    config.validate()?;
    Ok(())
}

async fn run_crawl<H: PageHandler>(
    config: &AppConfig, args: &CrawlArgs, fetcher: Fetcher, handler: H,
) -> Result<(CrawlReport, H)> {
    let cache = ResponseCache::open(&config.db_path, config.cache_ttl()).await?;
    let mut crawler = Crawler::new(fetcher, handler, CrawlConfig::from(config)).with_cache(cache);

    let report = crawler.crawl(&args.url, args.no_cache).await?;
    Ok((report, crawler.into_handler()))
}
