//! HTTP side of the sync protocol, plus the round-trips that keep the local
//! cache aligned with the server.
//!
//! - `GET  /machine-data/{username}`   -> history, oldest first
//! - `POST /machine-health/{username}` -> score | 400 `{error}` | 5xx

use crate::cache::{CacheError, ClientCache};
use crate::kv::KeyValueStore;
use crate::view::CacheView;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One stored record as returned by the server
pub type RemoteRecord = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct SyncClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SyncClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Url(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("health-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, route: &str, username: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .push(route)
            .push(username);
        Ok(url)
    }

    /// Fetch: the user's history, `[]` for an unknown user
    pub async fn fetch(&self, username: &str) -> Result<Vec<RemoteRecord>, ClientError> {
        let url = self.endpoint("machine-data", username)?;
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Submit: returns the score attached to the stored record
    pub async fn submit(&self, username: &str, submission: &Value) -> Result<Value, ClientError> {
        let url = self.endpoint("machine-health", username)?;
        debug!("POST {url}");
        let response = self.http.post(url).json(submission).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    if status == StatusCode::BAD_REQUEST {
        Err(ClientError::Rejected(message))
    } else {
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

/// Fetches the authoritative history and mirrors its newest record locally.
/// An empty history resets the cache.
pub async fn refresh<S: KeyValueStore>(
    cache: &ClientCache<S>,
    client: &SyncClient,
    username: &str,
) -> Result<Option<CacheView>, ClientError> {
    let history = client.fetch(username).await?;
    match history.last() {
        Some(newest) => {
            let view = CacheView::from_record(newest);
            cache.replace(view.clone())?;
            info!("cache refreshed from {} records", history.len());
            Ok(Some(view))
        }
        None => {
            cache.reset()?;
            info!("no history for {username}, cache cleared");
            Ok(None)
        }
    }
}

/// Submits, then replaces the cache with the submitted machines and their score
pub async fn submit_and_cache<S: KeyValueStore>(
    cache: &ClientCache<S>,
    client: &SyncClient,
    username: &str,
    submission: &Value,
) -> Result<Value, ClientError> {
    let score = client.submit(username, submission).await?;
    let machines = submission.get("machines").cloned().unwrap_or(Value::Null);
    cache.replace(CacheView::new(machines, score.clone()))?;
    Ok(score)
}
