use std::time::Duration;

use async_trait::async_trait;
use paper_notifier_core::config::DeliveryConfig;
use paper_notifier_core::digest::build_payloads;
use paper_notifier_core::{DigestSink, Paper};
use reqwest::header::HeaderMap;
use tracing::{info, warn};

use crate::error::{NetError, Result};
use crate::http::{RateLimitedClient, USER_AGENT, truncate_body};

/// Posts digest payloads to a Feishu bot or flow webhook, one request per
/// payload. Any non-2xx answer fails the delivery.
pub struct FeishuWebhook {
    client: RateLimitedClient,
    delivery: DeliveryConfig,
}

impl FeishuWebhook {
    pub fn new(delivery: DeliveryConfig) -> Result<Self> {
        if delivery.webhook_url.trim().is_empty() {
            return Err(NetError::Parse("webhook URL is empty".to_string()));
        }
        Ok(Self {
            client: RateLimitedClient::new("feishu", Duration::from_millis(0), USER_AGENT)?,
            delivery,
        })
    }

    pub async fn post_all(&self, papers: &[Paper]) -> Result<()> {
        let url = self.delivery.webhook_url.trim();
        let mode = self.delivery.mode.as_str();

        for payload in build_payloads(papers, &self.delivery) {
            match self
                .client
                .post_json_with_status(url, &payload, HeaderMap::new())
                .await
            {
                Ok((status, body)) => {
                    info!(mode, status, body = %truncate_body(&body), "Feishu response");
                }
                Err(err) => {
                    if let NetError::Api { status, body, .. } = &err {
                        warn!(mode, status, body = %body, "Feishu rejected payload");
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DigestSink for FeishuWebhook {
    async fn deliver(&self, papers: &[Paper]) -> paper_notifier_core::Result<()> {
        if papers.is_empty() {
            return Ok(());
        }
        self.post_all(papers)
            .await
            .map_err(NetError::into_delivery_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use paper_notifier_core::{NotifierError, WebhookMode};
    use serde_json::json;

    fn paper(title: &str) -> Paper {
        Paper::new(
            title,
            vec!["Ada".to_string()],
            "Clean abstract.",
            format!("https://x/{title}"),
            "arXiv",
            Utc::now(),
        )
    }

    fn delivery(url: String, mode: WebhookMode, single: bool) -> DeliveryConfig {
        DeliveryConfig {
            webhook_url: url,
            mode,
            flow_single_summary: single,
            ..DeliveryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bot_mode_posts_one_text_message() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/hook")
            .match_body(Matcher::PartialJson(json!({"msg_type": "text"})))
            .with_status(200)
            .with_body(r#"{"code":0}"#)
            .expect(1)
            .create_async()
            .await;

        let sink = FeishuWebhook::new(delivery(
            format!("{}/hook", server.url()),
            WebhookMode::Bot,
            true,
        ))
        .unwrap();
        sink.deliver(&[paper("One"), paper("Two")]).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_flow_mode_posts_per_paper() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/flow")
            .match_body(Matcher::PartialJson(json!({"authors": "Ada"})))
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let sink = FeishuWebhook::new(delivery(
            format!("{}/flow", server.url()),
            WebhookMode::Flow,
            false,
        ))
        .unwrap();
        sink.deliver(&[paper("One"), paper("Two")]).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_fails_delivery() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/hook")
            .with_status(400)
            .with_body("bad payload")
            .create_async()
            .await;

        let sink = FeishuWebhook::new(delivery(
            format!("{}/hook", server.url()),
            WebhookMode::Bot,
            true,
        ))
        .unwrap();
        let err = sink.deliver(&[paper("One")]).await.unwrap_err();
        assert!(matches!(err, NotifierError::Delivery(ref msg) if msg.contains("400")));
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(FeishuWebhook::new(DeliveryConfig::default()).is_err());
    }
}
