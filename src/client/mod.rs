//! Client library for the dispatch HTTP surface.
//!
//! Thin typed wrapper used by worker harnesses. The one piece of logic it
//! adds over raw HTTP is the `ServerUnavailable` outcome, synthesized on
//! connection failure so a worker can treat a dispatcher that is gone
//! (drained and exited, or not yet up) as an ordinary polling state.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::ClientError;
use crate::protocol::{
    GetWorkRequest, GetWorkResponse, ResultItem, StatusResponse, SubmitRequest, SubmitResponse,
    WorkItem, WorkTimeoutRequest, WorkTimeoutResponse,
};

/// Default per-request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Outcome of a `get_work` call, as seen by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedWork {
    /// Items to process.
    Items(Vec<WorkItem>),
    /// Nothing issuable yet; poll again after `retry_in` seconds.
    Retry { retry_in: u64 },
    /// Every line is persisted; the worker should exit.
    AllWorkComplete,
    /// The server could not be reached. Never sent by the server; workers
    /// typically treat it the same as `AllWorkComplete` during drain.
    ServerUnavailable,
}

/// HTTP client for a dispatcher server.
pub struct WorkClient {
    base_url: String,
    http: Client,
}

impl WorkClient {
    /// Creates a client for the dispatcher at `base_url`
    /// (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Requests up to `batch_size` work items.
    pub async fn get_work(&self, batch_size: usize) -> Result<FetchedWork, ClientError> {
        let url = format!("{}/get_work", self.base_url);
        let sent = self
            .http
            .post(&url)
            .json(&GetWorkRequest { batch_size })
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(err) if err.is_connect() => {
                debug!(url = %url, "dispatcher unreachable");
                return Ok(FetchedWork::ServerUnavailable);
            }
            Err(source) => return Err(ClientError::Request { url, source }),
        };

        let body: GetWorkResponse = decode(url, response).await?;
        Ok(match body {
            GetWorkResponse::Ok { items } => FetchedWork::Items(items),
            GetWorkResponse::Retry { retry_in } => FetchedWork::Retry { retry_in },
            GetWorkResponse::AllWorkComplete => FetchedWork::AllWorkComplete,
        })
    }

    /// Submits completed results; returns how many were newly accepted.
    pub async fn submit_results(&self, items: Vec<ResultItem>) -> Result<u64, ClientError> {
        let url = format!("{}/submit_result", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SubmitRequest { items })
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let body: SubmitResponse = decode(url, response).await?;
        Ok(body.count)
    }

    /// Changes the server's work timeout; returns the value now in effect.
    pub async fn set_work_timeout(&self, seconds: u64) -> Result<u64, ClientError> {
        let url = format!("{}/work_timeout", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&WorkTimeoutRequest { timeout: seconds })
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let body: WorkTimeoutResponse = decode(url, response).await?;
        Ok(body.timeout)
    }

    /// Fetches the server's queue counters.
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        decode(url, response).await
    }

    /// Returns the base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    url: String,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            url,
            status: status.as_u16(),
        });
    }
    response
        .json()
        .await
        .map_err(|source| ClientError::Decode { url, source })
}
