//! HTTP client for the upstream module proxy.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://proxy.golang.org";

/// Single-shot fetches of module artifacts from an upstream proxy.
///
/// `module` and `version` segments are passed through unchanged; the
/// caller supplies them already case-escaped.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch_latest(&self, module: &str) -> Result<Bytes>;
    async fn fetch_info(&self, module: &str, version: &str) -> Result<Bytes>;
    async fn fetch_mod(&self, module: &str, version: &str) -> Result<Bytes>;
    async fn fetch_zip(&self, module: &str, version: &str) -> Result<Bytes>;
}

/// Upstream proxy client over a pooled HTTP connection.
pub struct ProxyClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProxyClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::UpstreamTransport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(&self, url: String) -> Result<Bytes> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamTransport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .bytes()
                .await
                .map_err(|e| Error::UpstreamTransport(e.to_string())),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(Error::NotFound),
            status => Err(Error::UpstreamStatus(status.as_u16())),
        }
    }
}

#[async_trait]
impl UpstreamFetcher for ProxyClient {
    async fn fetch_latest(&self, module: &str) -> Result<Bytes> {
        self.fetch(format!("{}/{module}/@latest", self.base_url)).await
    }

    async fn fetch_info(&self, module: &str, version: &str) -> Result<Bytes> {
        self.fetch(format!("{}/{module}/@v/{version}.info", self.base_url))
            .await
    }

    async fn fetch_mod(&self, module: &str, version: &str) -> Result<Bytes> {
        self.fetch(format!("{}/{module}/@v/{version}.mod", self.base_url))
            .await
    }

    async fn fetch_zip(&self, module: &str, version: &str) -> Result<Bytes> {
        self.fetch(format!("{}/{module}/@v/{version}.zip", self.base_url))
            .await
    }
}
