use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{stream, StreamExt};
use lazy_static::lazy_static;
use lcrawl_extract::Record;
use regex::Regex;
use url::Url;

use crate::fetcher::Fetch;
use crate::limiter::{RateLimitedExt, RateLimiter};

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]+").unwrap();
}

/// File name of an archived page, derived from the URL path.
///
/// `https://learning.ua/matematyka/5-klas/a-1/` becomes `matematyka_5-klas_a-1.html`,
/// the site root becomes `index.html`.
pub fn archive_file_name(url: &Url) -> String {
    let name = UNSAFE_CHARS.replace_all(url.path(), "_");
    let name = name.trim_matches('_');
    if name.is_empty() {
        String::from("index.html")
    } else {
        format!("{name}.html")
    }
}

/// Saves the page of every record, under the same caps as discovery.
pub struct Archiver<'a, F> {
    fetcher: &'a F,
    dir: PathBuf,
    concurrency: usize,
    interval: Duration,
}

impl<'a, F> Archiver<'a, F>
where
    F: Fetch,
{
    pub fn new(fetcher: &'a F, dir: impl Into<PathBuf>, concurrency: usize, interval: Duration) -> Self {
        Self {
            fetcher,
            dir: dir.into(),
            concurrency,
            interval,
        }
    }

    /// Archives every record, keeping their order. A record whose page couldn't be
    /// saved is kept with no local path.
    pub async fn archive(&self, records: Vec<Record>) -> Vec<Record> {
        let limiter = RateLimiter::new(self.interval);
        let mut archived = stream::iter(records.into_iter().enumerate())
            .map(|(i, record)| async move {
                let local_path = self.save(&record).await;
                (i, record.archived(local_path))
            })
            .rate_limited(limiter, self.concurrency)
            .collect::<Vec<_>>()
            .await;

        archived.sort_unstable_by_key(|(i, _)| *i);
        archived.into_iter().map(|(_, record)| record).collect()
    }

    async fn save(&self, record: &Record) -> Option<String> {
        let url = match Url::parse(&record.url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping archive of {}: {e}", record.url);
                return None;
            }
        };

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Skipping archive: {e}");
                return None;
            }
        };

        let path = self.dir.join(archive_file_name(&url));
        match tokio::fs::write(&path, page).await {
            Ok(()) => Some(display(&path)),
            Err(e) => {
                log::error!("Couldn't write {} for {url}: {e}", path.display());
                None
            }
        }
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
