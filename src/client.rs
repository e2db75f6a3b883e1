//! Platform client: fetches a user's listings.
//!
//! [`PlatformClient`] is the seam between the assembler and the network.
//! [`RedditClient`] implements it against the public JSON listing API:
//!
//! ```text
//! GET {base_url}/user/{user}/comments.json?limit={n}&raw_json=1[&after={cursor}]
//! GET {base_url}/user/{user}/submitted.json?limit={n}&raw_json=1[&after={cursor}]
//! ```
//!
//! [`Pager`] follows `data.after` until the listing is exhausted, the cursor
//! repeats, or the caller's limit is reached. Responses go through the
//! optional [`HttpCache`].

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use redem_core::projector::RawRecord;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::cache::HttpCache;
use crate::config::Config;

/// Source of raw comment and submission records for a user.
///
/// Implementations return records newest first, as the platform lists them.
/// `limit` caps the number of records returned; `None` means everything the
/// platform will give.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn fetch_comments(&self, user: &str, limit: Option<usize>) -> Result<Vec<RawRecord>>;

    async fn fetch_submissions(&self, user: &str, limit: Option<usize>) -> Result<Vec<RawRecord>>;
}

/// HTTP client for the reddit listing API.
pub struct RedditClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
    cache: Option<HttpCache>,
}

impl RedditClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.fetch.user_agent.clone())
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let cache = config.cache.enabled.then(|| {
            HttpCache::new(
                config.cache.dir.clone(),
                Duration::from_secs(config.cache.expire_secs),
            )
        });

        Ok(Self {
            http,
            base_url: config.fetch.base_url.trim_end_matches('/').to_string(),
            page_size: config.fetch.page_size,
            cache,
        })
    }

    async fn get_json(&self, url: &Url) -> Result<Value> {
        let url = url.as_str();
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url).await {
                match serde_json::from_str(&body) {
                    Ok(value) => return Ok(value),
                    Err(e) => tracing::warn!("Ignoring unreadable cache entry for {}: {}", url, e),
                }
            }
        }

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "{} returned {}: {}",
                url,
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read response body: {}", url))?;
        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("Response from {} is not JSON", url))?;

        if let Some(cache) = &self.cache {
            cache.put(url, &body).await;
        }
        Ok(value)
    }
}

#[async_trait]
impl PageSource for RedditClient {
    async fn page(&self, url: &Url) -> Result<Value> {
        self.get_json(url).await
    }
}

#[async_trait]
impl PlatformClient for RedditClient {
    async fn fetch_comments(&self, user: &str, limit: Option<usize>) -> Result<Vec<RawRecord>> {
        let pager = Pager::new(&self.base_url, self.page_size);
        pager.collect(self, user, "comments", limit).await
    }

    async fn fetch_submissions(&self, user: &str, limit: Option<usize>) -> Result<Vec<RawRecord>> {
        let pager = Pager::new(&self.base_url, self.page_size);
        pager.collect(self, user, "submitted", limit).await
    }
}

/// Fetches one listing page as JSON.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn page(&self, url: &Url) -> Result<Value>;
}

/// Walks a listing's `after` cursors.
pub struct Pager<'a> {
    base_url: &'a str,
    page_size: usize,
}

impl<'a> Pager<'a> {
    pub fn new(base_url: &'a str, page_size: usize) -> Self {
        Self {
            base_url,
            page_size: page_size.max(1),
        }
    }

    /// Follow pages until the listing is exhausted, the cursor repeats, or
    /// `limit` records have been collected.
    pub async fn collect(
        &self,
        source: &dyn PageSource,
        user: &str,
        listing: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let remaining = limit.map(|l| l.saturating_sub(records.len()));
            if remaining == Some(0) {
                break;
            }
            let page_size = remaining.map_or(self.page_size, |r| r.min(self.page_size));
            let url = listing_url(self.base_url, user, listing, page_size, after.as_deref())?;

            let page = source.page(&url).await?;
            let (children, next) = parse_listing(&page)
                .with_context(|| format!("Unexpected listing shape from {}", url))?;
            tracing::debug!("{} {}: {} records from {}", user, listing, children.len(), url);

            let exhausted = children.is_empty();
            records.extend(children);

            match next {
                Some(cursor) if !exhausted => {
                    if !seen_cursors.insert(cursor.clone()) {
                        tracing::warn!(
                            "{} {}: cursor {} repeated, stopping",
                            user,
                            listing,
                            cursor
                        );
                        break;
                    }
                    after = Some(cursor);
                }
                _ => break,
            }
        }

        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

/// Build one listing page URL.
pub fn listing_url(
    base_url: &str,
    user: &str,
    listing: &str,
    page_size: usize,
    after: Option<&str>,
) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
    let file = format!("{}.json", listing);
    url.path_segments_mut()
        .map_err(|_| anyhow!("Base URL cannot have a path: {}", base_url))?
        .pop_if_empty()
        .extend(["user", user, file.as_str()]);

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("limit", &page_size.to_string())
            .append_pair("raw_json", "1");
        if let Some(cursor) = after {
            query.append_pair("after", cursor);
        }
    }
    Ok(url)
}

/// Split a listing page into its children and the next-page cursor.
pub fn parse_listing(page: &Value) -> Result<(Vec<RawRecord>, Option<String>)> {
    let Some(data) = page.get("data") else {
        bail!("listing has no 'data' object");
    };
    let children = match data.get("children") {
        Some(Value::Array(children)) => children.clone(),
        Some(_) => bail!("listing 'children' is not an array"),
        None => Vec::new(),
    };
    let after = data
        .get("after")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    Ok((children, after))
}
