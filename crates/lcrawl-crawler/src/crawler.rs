use anyhow::Context as _;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use lcrawl_extract::{Context, Page, Record, Rules, Site};
use url::Url;

use crate::aggregator::Aggregator;
use crate::archiver::Archiver;
use crate::config::CrawlerConfig;
use crate::fetcher::{Fetch, FetchError};
use crate::frontier::{Frontier, PageKind, WorkItem};
use crate::limiter::RateLimiter;

/// The result of a complete run.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub records: Vec<Record>,
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub archived: usize,
    pub archive_failed: usize,
    pub conflicts: usize,
}

/// The result of the discovery phase, once no page is queued or being visited.
#[derive(Debug, Default)]
pub struct Discovery {
    pub aggregator: Aggregator,
    pub pages_visited: usize,
    pub pages_failed: usize,
}

/// What a single page visit produced.
#[derive(Debug, Default)]
struct Visit {
    records: Vec<Record>,
    links: Vec<WorkItem>,
}

pub struct Crawler<F> {
    config: CrawlerConfig,
    site: Site,
    rules: Rules,
    fetcher: F,
}

impl<F> Crawler<F>
where
    F: Fetch,
{
    pub fn new(config: CrawlerConfig, fetcher: F) -> anyhow::Result<Self> {
        let site = config.site()?;
        let rules = Rules::compile(&config.rules).context("Invalid extraction rules")?;
        Ok(Self {
            config,
            site,
            rules,
            fetcher,
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Discovers every reachable item, deduplicates them and archives their pages.
    pub async fn run(&self) -> anyhow::Result<CrawlReport> {
        let html_dir = self.config.html_dir();
        tokio::fs::create_dir_all(&html_dir)
            .await
            .with_context(|| format!("Couldn't create {}", html_dir.display()))?;

        let discovery = self.discover().await;
        log::info!(
            "Visited {} pages ({} failed), found {} records",
            discovery.pages_visited,
            discovery.pages_failed,
            discovery.aggregator.len()
        );

        let unique = discovery.aggregator.into_unique();
        log::info!("Archiving {} unique records", unique.records.len());

        let records = Archiver::new(
            &self.fetcher,
            html_dir,
            self.config.concurrency(),
            self.config.interval(),
        )
        .archive(unique.records)
        .await;

        let archived = records.iter().filter(|r| r.local_path.is_some()).count();
        Ok(CrawlReport {
            archive_failed: records.len() - archived,
            archived,
            records,
            pages_visited: discovery.pages_visited,
            pages_failed: discovery.pages_failed,
            conflicts: unique.conflicts,
        })
    }

    /// Visits the start page and everything transitively discovered from it.
    ///
    /// Returns once the frontier is empty and no visit is in flight. Visits only
    /// report what they found, the frontier and the aggregator are updated here.
    pub async fn discover(&self) -> Discovery {
        let mut frontier = Frontier::new(self.site.clone());
        frontier.admit(self.site.seed().clone(), PageKind::Start, Context::default());

        let mut limiter = RateLimiter::new(self.config.interval());
        let mut in_flight = FuturesUnordered::new();
        let mut discovery = Discovery::default();
        let concurrency = self.config.concurrency();

        loop {
            let can_dispatch = in_flight.len() < concurrency && frontier.has_pending();
            if !can_dispatch && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                _ = limiter.ready(), if can_dispatch => {
                    if let Some(item) = frontier.next() {
                        log::debug!("Visiting {:?} page {}", item.kind, item.url);
                        in_flight.push(self.visit(item));
                    }
                }
                Some(visit) = in_flight.next(), if !in_flight.is_empty() => {
                    discovery.pages_visited += 1;
                    match visit {
                        Ok(Visit { records, links }) => {
                            discovery.aggregator.extend(records);
                            for WorkItem { url, kind, context } in links {
                                frontier.admit(url, kind, context);
                            }
                        }
                        Err(e) => {
                            discovery.pages_failed += 1;
                            log::warn!("Skipping page: {e}");
                        }
                    }
                }
                else => break,
            }
        }

        log::debug!("Discovery idle after admitting {} pages", frontier.seen());
        discovery
    }

    /// Fetches a single page and returns its records, without following any link.
    pub async fn scrap(&self, url: &Url) -> anyhow::Result<Vec<Record>> {
        let item = WorkItem {
            url: url.clone(),
            kind: PageKind::Listing,
            context: Context::default(),
        };
        Ok(self.visit(item).await?.records)
    }

    async fn visit(&self, item: WorkItem) -> Result<Visit, FetchError> {
        let body = self.fetcher.fetch(&item.url).await?;
        let page = Page::parse(&String::from_utf8_lossy(&body), item.url);

        let context = page.context(&self.rules);
        let records = page.records(&self.rules, &self.site, &context);

        let discovered = match item.kind {
            PageKind::Start => page.listing_links(&self.rules, &self.site),
            PageKind::Listing => page.pagination_links(&self.rules, &self.site),
        };
        let links: Vec<WorkItem> = discovered
            .into_iter()
            .map(|url| WorkItem {
                url,
                kind: PageKind::Listing,
                context: Context::default(),
            })
            .collect();

        log::debug!(
            "{}: {} records, {} links",
            page.url(),
            records.len(),
            links.len()
        );
        Ok(Visit { records, links })
    }
}
