// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with daemon API

use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use pattern_memory_cortex::application::{DecayReport, LearnOutcome, Remedy, RetryPolicy};
use pattern_memory_cortex::{Link, Outcome, Pattern, StoreStats, TaskResult};

use super::base_url;
use super::server::{DecayRequest, ErrorBody, LinkRequest};

/// An error body returned by the daemon
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} ({kind}, HTTP {status})")]
pub struct RemoteError {
    pub status: u16,
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url(host, port),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Submit a task result, retrying retryable daemon errors with backoff
    pub async fn learn(&self, result: &TaskResult) -> Result<LearnOutcome> {
        let mut attempt = 1;
        loop {
            let response = self
                .client
                .post(format!("{}/api/learn", self.base_url))
                .json(result)
                .send()
                .await
                .context("Failed to reach daemon")?;

            match parse::<LearnOutcome>(response).await {
                Err(e) if attempt < self.retry.max_attempts && is_retryable(&e) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Daemon could not learn, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub async fn link(&self, success: &str, failure: &str, reinforcement: Option<f64>) -> Result<Link> {
        let response = self
            .client
            .post(format!("{}/api/links", self.base_url))
            .json(&LinkRequest {
                success: success.to_string(),
                failure: failure.to_string(),
                reinforcement,
            })
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }

    pub async fn best_practices(
        &self,
        domain: Option<&str>,
        classification: Outcome,
        limit: usize,
    ) -> Result<Vec<Pattern>> {
        let mut query = vec![
            ("classification", classification.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(domain) = domain {
            query.push(("domain", domain.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/best-practices", self.base_url))
            .query(&query)
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let response = self
            .client
            .get(format!("{}/api/stats", self.base_url))
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Pattern> {
        let response = self
            .client
            .get(self.pattern_url(name, None)?)
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }

    pub async fn remedies(&self, failure_name: &str, limit: usize) -> Result<Vec<Remedy>> {
        let response = self
            .client
            .get(self.pattern_url(failure_name, Some("remedies"))?)
            .query(&[("limit", limit)])
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }

    pub async fn decay(&self, request: &DecayRequest) -> Result<DecayReport> {
        let response = self
            .client
            .post(format!("{}/api/decay", self.base_url))
            .json(request)
            .send()
            .await
            .context("Failed to reach daemon")?;
        parse(response).await
    }
}

impl DaemonClient {
    /// `/api/patterns/{name}[/{suffix}]` with the name encoded as one segment
    fn pattern_url(&self, name: &str, suffix: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid daemon URL")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Daemon URL cannot carry a path: {}", self.base_url))?;
            segments.pop_if_empty().extend(["api", "patterns", name]);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }
}

fn is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<RemoteError>().is_some_and(|e| e.retryable)
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.context("Failed to parse daemon response");
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| serde_json::from_value::<ErrorBody>(v["error"].clone()).ok());

    Err(match body {
        Some(body) => RemoteError {
            status: status.as_u16(),
            kind: body.kind,
            message: body.message,
            retryable: body.retryable,
        }
        .into(),
        None => anyhow::anyhow!("Daemon returned HTTP {}: {}", status, text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> DaemonClient {
        let url = server.url();
        let (host, port) = url.rsplit_once(':').unwrap();
        DaemonClient::new(host, port.parse().unwrap())
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                multiplier: 2.0,
                max_backoff: Duration::from_millis(2),
            })
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/patterns/missing")
            .with_status(404)
            .with_body(r#"{"error":{"kind":"pattern_not_found","message":"Pattern not found: missing","retryable":false}}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_pattern("missing").await.unwrap_err();
        let remote = err.downcast_ref::<RemoteError>().unwrap();
        assert_eq!(remote.status, 404);
        assert_eq!(remote.kind, "pattern_not_found");
    }

    #[tokio::test]
    async fn test_learn_retries_unavailable_daemon() {
        let mut server = mockito::Server::new_async().await;
        let unavailable = server
            .mock("POST", "/api/learn")
            .with_status(503)
            .with_body(r#"{"error":{"kind":"store_unavailable","message":"learning disabled, pattern not recorded","retryable":true}}"#)
            .expect(3)
            .create_async()
            .await;

        let err = client_for(&server)
            .learn(&TaskResult::new("t", "", 0.9))
            .await
            .unwrap_err();
        assert!(is_retryable(&err));
        unavailable.assert_async().await;
    }

    #[tokio::test]
    async fn test_pattern_name_is_one_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("GET", "/api/patterns/failure:a%2Fb%3Fc%23d:1234abcd/remedies")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "3".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let remedies = client_for(&server).remedies("failure:a/b?c#d:1234abcd", 3).await.unwrap();
        assert!(remedies.is_empty());
        found.assert_async().await;
    }
}
