use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use paper_notifier_core::{FetchRequest, Paper, PaperSource};
use reqwest::Url;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT};

const BASE_URL: &str = "https://api.crossref.org";
const SOURCE_NAME: &str = "Crossref";
const MISSING_ABSTRACT: &str = "No abstract provided.";

pub struct CrossRefSource {
    client: RateLimitedClient,
    base_url: String,
    rows: u32,
    polite_email: Option<String>,
}

impl CrossRefSource {
    pub fn new(rows: u32, polite_email: Option<String>) -> Result<Self> {
        Self::with_params(BASE_URL, Duration::from_millis(100), rows, polite_email)
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        rows: u32,
        polite_email: Option<String>,
    ) -> Result<Self> {
        let polite_email = polite_email.filter(|email| !email.trim().is_empty());
        let user_agent = match &polite_email {
            Some(email) => format!("{USER_AGENT} (mailto:{email})"),
            None => USER_AGENT.to_string(),
        };

        Ok(Self {
            client: RateLimitedClient::new("crossref", min_interval, &user_agent)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            rows,
            polite_email,
        })
    }

    fn works_url(&self, request: &FetchRequest) -> Result<Url> {
        let filter = format!(
            "from-pub-date:{},until-pub-date:{}",
            request.cutoff().date_naive(),
            request.now.date_naive()
        );
        let rows = self.rows.to_string();
        let mut params = vec![
            ("query.title", request.query.as_str()),
            ("rows", rows.as_str()),
            ("sort", "published"),
            ("order", "desc"),
            ("filter", filter.as_str()),
        ];
        if let Some(email) = &self.polite_email {
            params.push(("mailto", email.as_str()));
        }

        let base = format!("{}/works", self.base_url);
        Url::parse_with_params(&base, &params)
            .map_err(|e| NetError::Parse(format!("invalid Crossref URL {base}: {e}")))
    }

    pub async fn search(&self, request: &FetchRequest) -> Result<Vec<Paper>> {
        let url = self.works_url(request)?;
        let val: Value = self.client.get_json(url.as_str(), HeaderMap::new()).await?;

        let items = val["message"]["items"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();

        let papers: Vec<Paper> = items
            .iter()
            .map(paper_from_item)
            .filter(|p| request.is_recent(p.published))
            .collect();
        debug!(total = items.len(), recent = papers.len(), "Crossref works parsed");
        Ok(papers)
    }
}

#[async_trait]
impl PaperSource for CrossRefSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> paper_notifier_core::Result<Vec<Paper>> {
        self.search(request)
            .await
            .map_err(|e| e.into_source_error(SOURCE_NAME))
    }
}

fn paper_from_item(item: &Value) -> Paper {
    let title = item["title"][0].as_str().unwrap_or_default().trim();
    let venue = item["container-title"][0]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(SOURCE_NAME);
    let abstract_text = item["abstract"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(MISSING_ABSTRACT);
    let url = item["URL"].as_str().unwrap_or_default();

    Paper::new(
        title,
        parse_authors(item),
        abstract_text,
        url,
        venue,
        parse_published(item),
    )
}

/// `"given family"` per author, organisation name when neither is present.
fn parse_authors(item: &Value) -> Vec<String> {
    item["author"]
        .as_array()
        .map(|a| {
            a.iter()
                .map(|v| {
                    let given = v["given"].as_str().unwrap_or_default().trim();
                    let family = v["family"].as_str().unwrap_or_default().trim();
                    match (given.is_empty(), family.is_empty()) {
                        (false, false) => format!("{given} {family}"),
                        (false, true) => given.to_string(),
                        (true, false) => family.to_string(),
                        (true, true) => v["name"].as_str().unwrap_or_default().trim().to_string(),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `published.date-parts[0]`, with a missing month or day read as 1. Absent
/// or impossible dates fall back to the epoch so the cutoff drops them.
fn parse_published(item: &Value) -> DateTime<Utc> {
    let parts = &item["published"]["date-parts"][0];
    let year = parts[0].as_i64().and_then(|n| i32::try_from(n).ok());
    let month = parts[1].as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(1);
    let day = parts[2].as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(1);

    year.and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
