use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use paper_notifier_core::{FetchRequest, Paper, PaperSource};
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT};

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const SOURCE_NAME: &str = "Semantic Scholar";
const SEARCH_FIELDS: &str = "title,authors,abstract,venue,year,url,publicationDate";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
const MAX_LIMIT: u32 = 100;

pub struct SemanticScholarSource {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    limit: u32,
}

impl SemanticScholarSource {
    pub fn new(limit: u32, api_key: Option<String>) -> Result<Self> {
        let min_interval = if api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            Duration::from_millis(100)
        } else {
            Duration::from_secs(1)
        };
        Self::with_params(BASE_URL, min_interval, limit, api_key)
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        limit: u32,
        api_key: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::new("semantic_scholar", min_interval, USER_AGENT)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit: limit.clamp(1, MAX_LIMIT),
        })
    }

    /// An empty query returns nothing without a request; HTTP 429 also
    /// yields an empty list.
    pub async fn search(&self, request: &FetchRequest) -> Result<Vec<Paper>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let base = format!("{}/paper/search", self.base_url);
        let limit = self.limit.to_string();
        let url = Url::parse_with_params(
            &base,
            &[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", SEARCH_FIELDS),
            ],
        )
        .map_err(|e| NetError::Parse(format!("invalid URL {base}: {e}")))?;

        let json: Value = match self.client.get_json(url.as_str(), self.auth_headers()?).await {
            Ok(json) => json,
            Err(err) if err.is_rate_limited() => {
                warn!("Semantic Scholar rate limit hit; returning no papers");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let items = json
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let papers: Vec<Paper> = items
            .iter()
            .map(|item| paper_from_json(item, request.now))
            .filter(|p| request.is_recent(p.published))
            .collect();
        debug!(total = items.len(), recent = papers.len(), "Semantic Scholar papers parsed");
        Ok(papers)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let value = HeaderValue::from_str(key).map_err(|e| NetError::Parse(e.to_string()))?;
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> paper_notifier_core::Result<Vec<Paper>> {
        self.search(request)
            .await
            .map_err(|e| e.into_source_error(SOURCE_NAME))
    }
}

fn paper_from_json(v: &Value, now: DateTime<Utc>) -> Paper {
    let authors = v
        .get("authors")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let venue = Some(str_field(v, "venue"))
        .filter(|s| !s.is_empty())
        .unwrap_or(SOURCE_NAME);

    Paper::new(
        str_field(v, "title"),
        authors,
        str_field(v, "abstract"),
        str_field(v, "url"),
        venue,
        parse_publication_date(v).unwrap_or(now),
    )
}

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
}

/// `publicationDate`, else January 1 of `year`.
fn parse_publication_date(v: &Value) -> Option<DateTime<Utc>> {
    let from_date = v
        .get("publicationDate")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
    let from_year = || {
        v.get("year")
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
            .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    };

    from_date
        .or_else(from_year)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
