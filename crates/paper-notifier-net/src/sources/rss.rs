use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use paper_notifier_core::{FetchRequest, Paper, PaperSource};
use tracing::{debug, warn};

use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT};

const SOURCE_NAME: &str = "RSS";

/// Configured RSS/Atom feeds, fetched in order. A feed that fails to load
/// or parse is skipped.
pub struct RssSource {
    client: RateLimitedClient,
    feeds: Vec<String>,
}

impl RssSource {
    pub fn new(feeds: Vec<String>) -> Result<Self> {
        Self::with_params(feeds, Duration::from_millis(200))
    }

    pub fn with_params(feeds: Vec<String>, min_interval: Duration) -> Result<Self> {
        let feeds = feeds
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        Ok(Self {
            client: RateLimitedClient::new("rss", min_interval, USER_AGENT)?,
            feeds,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    async fn load_feed(&self, url: &str) -> Result<Feed> {
        let bytes = self.client.get_bytes(url).await?;
        feed_rs::parser::parse(&bytes[..]).map_err(|e| NetError::Feed(format!("{url}: {e}")))
    }

    pub async fn collect(&self, request: &FetchRequest) -> Vec<Paper> {
        let mut papers = Vec::new();
        for url in &self.feeds {
            let feed = match self.load_feed(url).await {
                Ok(feed) => feed,
                Err(err) => {
                    warn!(feed = %url, error = %err, "skipping RSS feed");
                    continue;
                }
            };

            let batch = papers_from_feed(feed, request);
            debug!(feed = %url, count = batch.len(), "RSS feed parsed");
            papers.extend(batch);
        }
        papers
    }
}

#[async_trait]
impl PaperSource for RssSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> paper_notifier_core::Result<Vec<Paper>> {
        Ok(self.collect(request).await)
    }
}

pub fn papers_from_feed(feed: Feed, request: &FetchRequest) -> Vec<Paper> {
    let source = feed
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| SOURCE_NAME.to_string());

    feed.entries
        .into_iter()
        .map(|entry| paper_from_entry(entry, &source, request.now))
        .filter(|p| request.is_recent(p.published))
        .collect()
}

fn paper_from_entry(entry: Entry, source: &str, now: DateTime<Utc>) -> Paper {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let abstract_text = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();
    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let authors = entry.authors.into_iter().map(|a| a.name).collect();
    let published = entry.published.or(entry.updated).unwrap_or(now);

    Paper::new(title, authors, abstract_text, url, source, published)
}
