use std::cmp;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use lcrawl_extract::{ExtractRules, Site};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Origin used for root-relative links, defaults to the start URL's origin
    #[serde(default)]
    pub origin: Option<String>,

    /// Path prefix of listing pages, defaults to the start URL's path
    #[serde(default)]
    pub section_path: Option<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// The maximum number of pages being fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// The minimum delay in milliseconds between two request starts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub rules: ExtractRules,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            origin: None,
            section_path: None,
            output_dir: default_output_dir(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            interval_ms: default_interval_ms(),
            rules: ExtractRules::default(),
        }
    }
}

fn default_start_url() -> String {
    String::from("https://learning.ua/matematyka/")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_user_agent() -> String {
    String::from("learning-ua-crawler/1.0 (+github.com)")
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_concurrency() -> usize {
    3
}

fn default_interval_ms() -> u64 {
    800
}

impl CrawlerConfig {
    pub fn site(&self) -> anyhow::Result<Site> {
        let seed = Url::parse(&self.start_url)
            .with_context(|| format!("Invalid start URL: {}", self.start_url))?;
        let origin = self
            .origin
            .as_deref()
            .map(|o| Url::parse(o).with_context(|| format!("Invalid origin: {o}")))
            .transpose()?;
        Ok(Site::new(seed, origin, self.section_path.clone()))
    }

    pub fn concurrency(&self) -> usize {
        cmp::max(1, self.concurrency)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Where archived item pages are written.
    pub fn html_dir(&self) -> PathBuf {
        self.output_dir.join("html")
    }
}
