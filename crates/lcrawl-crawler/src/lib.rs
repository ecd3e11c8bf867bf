mod aggregator;
mod archiver;
mod config;
mod crawler;
mod fetcher;
mod frontier;
mod limiter;

pub use aggregator::{Aggregator, Unique};
pub use archiver::{archive_file_name, Archiver};
pub use config::CrawlerConfig;
pub use crawler::{CrawlReport, Crawler, Discovery};
pub use fetcher::{Fetch, FetchCause, FetchError, HttpFetcher};
pub use frontier::{Frontier, PageKind, WorkItem};
pub use limiter::{RateLimited, RateLimitedExt, RateLimiter};

pub use anyhow;
pub use lcrawl_extract::{Context, ExtractRules, Record};
