//! Client for the remote authority
//!
//! The authority exposes two idempotent GET endpoints: `/status`, returning
//! at least `{"hash": "..."}`, and `/regions`, returning a full manifest.

use async_trait::async_trait;
use lands_storage::{DecodedManifest, decode_manifest_json};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::SyncError;

/// Body of the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStatus {
    pub hash: String,
}

/// Source of the authoritative manifest
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Cheap check of the remote manifest hash
    async fn fetch_status(&self) -> Result<RemoteStatus, SyncError>;

    /// Download the full manifest
    async fn fetch_manifest(&self) -> Result<DecodedManifest, SyncError>;
}

/// [`RemoteSource`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    status_url: String,
    regions_url: String,
}

impl HttpRemote {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = &config.auth {
            let (name, value) = auth.header_pair();
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SyncError::config(format!("invalid auth header name '{name}': {e}")))?;
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| SyncError::config(format!("invalid auth header value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::config(e.to_string()))?;

        let base = config.base_url();
        Ok(Self {
            client,
            status_url: format!("{base}/status"),
            regions_url: format!("{base}/regions"),
        })
    }

    async fn get(&self, url: &str, accept: fn(StatusCode) -> bool) -> Result<Vec<u8>, SyncError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "Remote responded");

        if !accept(status) {
            return Err(SyncError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn fetch_status(&self) -> Result<RemoteStatus, SyncError> {
        let body = self.get(&self.status_url, |s| s.is_success()).await?;
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::decode(format!("invalid status response: {e}")))
    }

    async fn fetch_manifest(&self) -> Result<DecodedManifest, SyncError> {
        let body = self.get(&self.regions_url, |s| s == StatusCode::OK).await?;
        decode_manifest_json(&body).map_err(|e| SyncError::decode(e.to_string()))
    }
}
