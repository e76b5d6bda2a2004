use std::time::Duration;

use async_trait::async_trait;
use paper_notifier_core::config::EnrichmentConfig;
use paper_notifier_core::{ImpactGenerator, Paper};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT};

const BASE_URL: &str = "https://openrouter.ai/api/v1";
const PROMPT_AUTHOR_LIMIT: usize = 8;
const MIN_TIMEOUT_SECS: u64 = 5;

/// Impact text from an OpenRouter chat-completion model.
pub struct OpenRouterGenerator {
    client: RateLimitedClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
    /// `None` when no API key is configured.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Option<Self>> {
        if config.api_key.trim().is_empty() {
            return Ok(None);
        }
        Self::with_params(
            BASE_URL,
            &config.api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    pub fn with_params(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let timeout = timeout.max(Duration::from_secs(MIN_TIMEOUT_SECS));
        Ok(Self {
            client: RateLimitedClient::with_timeout(
                "openrouter",
                Duration::from_millis(0),
                USER_AGENT,
                timeout,
            )?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }

    pub async fn complete(&self, paper: &Paper) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(paper) }],
        });

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| NetError::Parse(e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let text = self.client.post_json(&url, &body, headers).await?;
        let response: Value =
            serde_json::from_str(&text).map_err(|e| NetError::Parse(e.to_string()))?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!(url = %paper.url, chars = content.len(), "impact text generated");
        Ok(content)
    }
}

#[async_trait]
impl ImpactGenerator for OpenRouterGenerator {
    async fn generate(&self, paper: &Paper) -> paper_notifier_core::Result<String> {
        self.complete(paper)
            .await
            .map_err(NetError::into_generator_error)
    }
}

pub fn build_prompt(paper: &Paper) -> String {
    let authors = if paper.authors.is_empty() {
        "Unknown authors".to_string()
    } else {
        paper
            .authors
            .iter()
            .take(PROMPT_AUTHOR_LIMIT)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "You are helping a research digest. Assess the likely impact of the paper below \
         using its abstract. Reply with exactly two lines and nothing else:\n\
         Scientific impact: <one sentence>\n\
         Social or industry impact: <one sentence>\n\
         Do not use markdown, bullets or headings. Avoid hype.\n\n\
         Title: {}\n\
         Authors: {authors}\n\
         Venue: {}\n\
         Abstract: {}\n\
         URL: {}",
        paper.title, paper.source, paper.abstract_text, paper.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::{Matcher, Server};

    fn paper(authors: usize) -> Paper {
        Paper::new(
            "Qubit readout",
            (1..=authors).map(|i| format!("Author {i}")).collect(),
            "Fast readout.",
            "https://x/1",
            "arXiv",
            Utc::now(),
        )
    }

    #[test]
    fn prompt_caps_authors_at_eight() {
        let prompt = build_prompt(&paper(10));
        assert!(prompt.contains("Author 8"));
        assert!(!prompt.contains("Author 9"));
        assert!(prompt.contains("Title: Qubit readout"));
        assert!(prompt.contains("Scientific impact:"));
        assert!(prompt.contains("Social or industry impact:"));
    }

    #[test]
    fn missing_key_disables_generator() {
        let config = EnrichmentConfig {
            api_key: "  ".to_string(),
            ..EnrichmentConfig::default()
        };
        assert!(OpenRouterGenerator::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "openrouter/auto"})))
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": " Scientific impact: A.\nSocial or industry impact: B. "
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let generator = OpenRouterGenerator::with_params(
            &server.url(),
            "sk-test",
            "openrouter/auto",
            Duration::from_secs(5),
        )
        .unwrap();
        let text = generator.generate(&paper(1)).await.unwrap();
        assert_eq!(text, "Scientific impact: A.\nSocial or industry impact: B.");
    }

    #[tokio::test]
    async fn test_generate_error_status_is_generator_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":"bad key"}"#)
            .create_async()
            .await;

        let generator =
            OpenRouterGenerator::with_params(&server.url(), "k", "m", Duration::from_secs(5))
                .unwrap();
        let err = generator.generate(&paper(1)).await.unwrap_err();
        assert!(matches!(err, paper_notifier_core::NotifierError::Generator(_)));
    }
}
