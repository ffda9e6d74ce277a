//! fal.ai queue client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::time::Instant;

use super::types::{StatusResponse, SubmitResponse};
use crate::error::StudioError;
use crate::providers::{GenerationProvider, ProgressObserver, ProviderError, ProviderResponse};
use crate::retry::{RetryPolicy, retry_transient};
use crate::types::GenerationOutput;

pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// fal queue client configuration
#[derive(Debug, Clone)]
pub struct FalConfig {
    /// Queue API base URL
    pub queue_url: String,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Give up waiting for a queued request after this long
    pub max_wait: Duration,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Retry applied to status polls
    pub retry: RetryPolicy,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(600),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl FalConfig {
    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Generation provider backed by the fal.ai queue API.
pub struct FalClient {
    http: reqwest::Client,
    config: FalConfig,
}

impl FalClient {
    pub fn new(config: FalConfig) -> Result<Self, StudioError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http_client(http, config))
    }

    pub fn with_http_client(http: reqwest::Client, config: FalConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FalConfig {
        &self.config
    }

    fn auth_headers(credentials: &SecretString) -> Result<HeaderMap, ProviderError> {
        let mut value = HeaderValue::from_str(&format!("Key {}", credentials.expose_secret()))
            .map_err(|_| ProviderError::transport("API key contains characters not allowed in a header"))?;
        value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn base_url(&self) -> &str {
        self.config.queue_url.trim_end_matches('/')
    }

    /// Queue URLs are scoped to the app (`owner/app`), not the full model path.
    fn app_id(model_id: &str) -> String {
        model_id.split('/').take(2).collect::<Vec<_>>().join("/")
    }

    fn status_url(&self, model_id: &str, submitted: &SubmitResponse) -> String {
        submitted.status_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/requests/{}/status",
                self.base_url(),
                Self::app_id(model_id),
                submitted.request_id
            )
        })
    }

    fn response_url(&self, model_id: &str, submitted: &SubmitResponse) -> String {
        submitted.response_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/requests/{}",
                self.base_url(),
                Self::app_id(model_id),
                submitted.request_id
            )
        })
    }

    async fn submit(
        &self,
        model_id: &str,
        input: &Map<String, Value>,
        headers: &HeaderMap,
    ) -> Result<SubmitResponse, ProviderError> {
        let url = format!("{}/{}", self.base_url(), model_id);
        let resp = self
            .http
            .post(url)
            .headers(headers.clone())
            .json(input)
            .send()
            .await?;
        decode(check_status(resp).await?).await
    }

    async fn poll_status(&self, url: &str, headers: &HeaderMap) -> Result<StatusResponse, ProviderError> {
        let http = &self.http;
        retry_transient(&self.config.retry, move || async move {
            let resp = http
                .get(url)
                .query(&[("logs", "1")])
                .headers(headers.clone())
                .send()
                .await?;
            decode(check_status(resp).await?).await
        })
        .await
    }

    async fn fetch_result(&self, url: &str, headers: &HeaderMap) -> Result<GenerationOutput, ProviderError> {
        let resp = self.http.get(url).headers(headers.clone()).send().await?;
        decode(check_status(resp).await?).await
    }
}

/// Pass successful responses through; turn the rest into a `ProviderError`.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(error_from_body(status, &text))
}

fn error_from_body(status: StatusCode, text: &str) -> ProviderError {
    let body = serde_json::from_str::<Value>(text).ok();
    let message = match body.as_ref().and_then(|b| b.get("detail")) {
        Some(Value::String(detail)) => detail.clone(),
        Some(detail) => detail.to_string(),
        None if !text.trim().is_empty() => text.chars().take(500).collect(),
        None => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    ProviderError::api(status.as_u16(), body, message)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::api(status, None, format!("invalid provider response: {e}")))
}

#[async_trait]
impl GenerationProvider for FalClient {
    fn provider_id(&self) -> &str {
        "fal"
    }

    async fn subscribe(
        &self,
        model_id: &str,
        input: &Map<String, Value>,
        credentials: &SecretString,
        on_update: Option<ProgressObserver<'_>>,
    ) -> Result<ProviderResponse, ProviderError> {
        let headers = Self::auth_headers(credentials)?;
        let submitted = self.submit(model_id, input, &headers).await?;
        tracing::debug!(model = model_id, request_id = %submitted.request_id, "request queued");

        let status_url = self.status_url(model_id, &submitted);
        let mut response_url = self.response_url(model_id, &submitted);
        let started = Instant::now();

        loop {
            let status = self.poll_status(&status_url, &headers).await?;
            let update = status.to_update();
            tracing::debug!(request_id = %submitted.request_id, status = update.status(), "queue update");
            if let Some(observer) = on_update {
                observer(&update);
            }
            if status.is_completed() {
                if let Some(url) = status.response_url {
                    response_url = url;
                }
                break;
            }
            if started.elapsed() >= self.config.max_wait {
                return Err(ProviderError::transport(format!(
                    "timed out after {:?} waiting for request {}",
                    self.config.max_wait, submitted.request_id
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        let output = self.fetch_result(&response_url, &headers).await?;
        Ok(ProviderResponse {
            request_id: submitted.request_id,
            output,
        })
    }
}
