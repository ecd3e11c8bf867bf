use std::future::Future;

use reqwest::header::USER_AGENT;
use url::Url;

use crate::config::CrawlerConfig;

#[derive(Debug, thiserror::Error)]
#[error("Couldn't fetch {url}: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchCause {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error(transparent)]
    Transport(reqwest::Error),
}

impl FetchError {
    pub fn new(url: &Url, cause: FetchCause) -> Self {
        Self {
            url: url.to_string(),
            cause,
        }
    }
}

/// Retrieves raw page bodies. A failed fetch is terminal, callers decide what to do with it.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

impl<T> Fetch for &T
where
    T: Fetch + ?Sized,
{
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>> {
        (**self).fetch(url)
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FetchError::new(url, transport(e)))?;

        let status = resp.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(FetchError::new(url, FetchCause::Status(status)));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::new(url, transport(e)))?;
        Ok(body.to_vec())
    }
}

fn transport(e: reqwest::Error) -> FetchCause {
    if e.is_timeout() {
        FetchCause::Timeout
    } else {
        FetchCause::Transport(e)
    }
}
