//! HTTP client for the store catalog
//!
//! Every request identifies the release and architecture of the system and,
//! for OEM-scoped devices, the store. Calls are single-shot: no retries.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snapkit_core::{ProgressSink, Release, host_architecture};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{RepoError, Result};
use crate::fetch::Fetcher;

pub const RELEASE_HEADER: &str = "X-Ubuntu-Release";
pub const ARCHITECTURE_HEADER: &str = "X-Ubuntu-Architecture";
pub const STORE_HEADER: &str = "X-Ubuntu-Store";

const HAL_JSON: &str = "application/hal+json";
const JSON: &str = "application/json";
const TIMEOUT_SECS: u64 = 30;

/// Identification sent with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeaders {
    pub release: String,
    pub architecture: String,
    pub store_id: Option<String>,
}

impl Default for StoreHeaders {
    fn default() -> Self {
        Self {
            release: Release::default().to_string(),
            architecture: host_architecture().to_string(),
            store_id: None,
        }
    }
}

impl StoreHeaders {
    pub fn new(release: &Release, architecture: impl Into<String>) -> Self {
        Self {
            release: release.to_string(),
            architecture: architecture.into(),
            store_id: None,
        }
    }

    pub fn with_store_id(mut self, store_id: Option<String>) -> Self {
        self.store_id = store_id.filter(|id| !id.is_empty());
        self
    }
}

/// Catalog HTTP client
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    headers: StoreHeaders,
}

impl StoreClient {
    pub fn new(headers: StoreHeaders) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self { client, headers })
    }

    pub fn headers(&self) -> &StoreHeaders {
        &self.headers
    }

    fn request(&self, method: Method, url: Url, accept: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, accept)
            .header(RELEASE_HEADER, &self.headers.release)
            .header(ARCHITECTURE_HEADER, &self.headers.architecture);

        if let Some(store_id) = &self.headers.store_id {
            request = request.header(STORE_HEADER, store_id);
        }
        request
    }

    /// GET a HAL+JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.request(Method::GET, url, HAL_JSON).send().await?;
        let body = check_status(response)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!("POST {}", url);
        let response = self.request(Method::POST, url, JSON).json(body).send().await?;
        let body = check_status(response)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(RepoError::NotFound {
            name: response.url().to_string(),
        });
    }
    if !status.is_success() {
        return Err(RepoError::HttpError {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("request failed").to_string(),
        });
    }
    Ok(response)
}

#[async_trait]
impl Fetcher for StoreClient {
    async fn fetch(&self, url: &str, dest: &Path, progress: &dyn ProgressSink) -> Result<u64> {
        let url = Url::parse(url).map_err(|e| RepoError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!("downloading {} to {}", url, dest.display());

        let response = self.request(Method::GET, url, "*/*").send().await?;
        let mut response = check_status(response)?;

        let label = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        progress.start(&label, response.content_length().unwrap_or(0));

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress.set(written);
        }
        file.flush().await?;
        progress.finished();

        Ok(written)
    }
}
