use std::time::Duration;

use async_trait::async_trait;
use paper_notifier_core::{FetchRequest, Paper, PaperSource};
use reqwest::Url;
use tracing::debug;

use crate::arxiv::parser::{SOURCE_NAME, parse_atom_response};
use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT};

const BASE_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivSource {
    client: RateLimitedClient,
    base_url: String,
    max_results: u32,
}

impl ArxivSource {
    pub fn new(max_results: u32) -> Result<Self> {
        Self::with_params(BASE_URL, Duration::from_secs(3), max_results)
    }

    pub fn with_params(base_url: &str, min_interval: Duration, max_results: u32) -> Result<Self> {
        Ok(Self {
            client: RateLimitedClient::new("arxiv", min_interval, USER_AGENT)?,
            base_url: base_url.to_string(),
            max_results,
        })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let max_results = self.max_results.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", format!("all:{query}").as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ],
        )
        .map_err(|e| NetError::Parse(format!("invalid arXiv URL {}: {e}", self.base_url)))
    }

    pub async fn search(&self, request: &FetchRequest) -> Result<Vec<Paper>> {
        let url = self.search_url(&request.query)?;
        let xml = self.client.get(url.as_str()).await?;
        let papers = parse_atom_response(&xml)?;
        let total = papers.len();

        let recent: Vec<Paper> = papers
            .into_iter()
            .filter(|p| request.is_recent(p.published))
            .collect();
        debug!(total, recent = recent.len(), "arXiv entries parsed");
        Ok(recent)
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, request: &FetchRequest) -> paper_notifier_core::Result<Vec<Paper>> {
        self.search(request)
            .await
            .map_err(|e| e.into_source_error(SOURCE_NAME))
    }
}
