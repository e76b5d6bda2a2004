use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{NetError, Result};

pub const USER_AGENT: &str = concat!("paper-notifier/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const ERROR_BODY_LIMIT: usize = 200;

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// One `reqwest` client per service, spacing requests by `min_interval`.
/// Non-2xx answers become [`NetError::Api`], 429 becomes
/// [`NetError::RateLimited`]. Nothing is retried.
pub struct RateLimitedClient {
    client: reqwest::Client,
    service: String,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimitedClient {
    pub fn new(service: &str, min_interval: Duration, user_agent: &str) -> Result<Self> {
        Self::with_timeout(service, min_interval, user_agent, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        service: &str,
        min_interval: Duration,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            service: service.to_string(),
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        self.wait_for_rate_limit().await;
        debug!(service = %self.service, url, "GET");
        let resp = self.client.get(url).headers(headers).send().await?;
        let resp = self.check_status(url, resp).await?;
        Ok(resp.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.wait_for_rate_limit().await;
        debug!(service = %self.service, url, "GET");
        let resp = self.client.get(url).send().await?;
        let resp = self.check_status(url, resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        let text = self.get_with_headers(url, headers).await?;
        serde_json::from_str(&text).map_err(|e| NetError::Parse(e.to_string()))
    }

    /// POST a JSON body and return the raw response text.
    pub async fn post_json<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<String> {
        let (_, text) = self.post_json_with_status(url, body, headers).await?;
        Ok(text)
    }

    pub async fn post_json_with_status<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<(u16, String)> {
        self.wait_for_rate_limit().await;
        debug!(service = %self.service, url, "POST");
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let resp = self.check_status(url, resp).await?;
        let status = resp.status().as_u16();
        Ok((status, resp.text().await?))
    }

    async fn check_status(&self, url: &str, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NetError::RateLimited(self.service.clone()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NetError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(resp)
    }
}

pub fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client() -> RateLimitedClient {
        RateLimitedClient::new("test", Duration::from_millis(0), USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn non_success_status_carries_truncated_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/fail")
            .with_status(500)
            .with_body("x".repeat(500))
            .create_async()
            .await;

        let err = client()
            .get(&format!("{}/fail", server.url()))
            .await
            .unwrap_err();
        match err {
            NetError::Api { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/busy")
            .with_status(429)
            .create_async()
            .await;

        let err = client()
            .get(&format!("{}/busy", server.url()))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn requests_are_spaced() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("ok")
            .expect(2)
            .create_async()
            .await;

        let client =
            RateLimitedClient::new("test", Duration::from_millis(150), USER_AGENT).unwrap();
        let url = format!("{}/ok", server.url());
        let start = Instant::now();
        client.get(&url).await.unwrap();
        client.get(&url).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
