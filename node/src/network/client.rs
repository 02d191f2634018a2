// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client for the DeviceAtlas Cloud detection API.

use std::time::Duration;

use async_trait::async_trait;
use devicemap_kernel::PropertyBag;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::errors::{ConfigError, LookupError};

pub const DETECT_PATH: &str = "/v1/detect/properties";

/// Resolves one identifier string into a property bag.
///
/// Implementations must bound every call with their own timeout; the
/// reconciler runs several lookups at once and never cancels them.
#[async_trait]
pub trait DeviceLookup: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<PropertyBag, LookupError>;
}

#[derive(Deserialize)]
struct DetectResponse {
    properties: PropertyBag,
}

#[derive(Debug, Clone)]
pub struct ClassificationClient {
    base_url: String,
    licence_key: String,
    timeout: Duration,
    client: Client,
}

impl ClassificationClient {
    pub fn new(cfg: &ResolverConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            base_url: cfg.endpoint.trim_end_matches('/').to_string(),
            licence_key: cfg.licence_key.clone(),
            timeout: cfg.request_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.timeout)
        } else {
            LookupError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl DeviceLookup for ClassificationClient {
    async fn lookup(&self, identifier: &str) -> Result<PropertyBag, LookupError> {
        let url = format!("{}{}", self.base_url, DETECT_PATH);
        let resp = self
            .client
            .get(&url)
            .query(&[("licencekey", self.licence_key.as_str()), ("useragent", identifier)])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::debug!("Detection call for {:?} failed with HTTP {}", identifier, status);
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: DetectResponse =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(parsed.properties)
    }
}
