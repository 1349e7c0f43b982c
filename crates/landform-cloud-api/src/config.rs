//! Platform API connection settings

use crate::error::{ApiClientError, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.landform.dev";
pub const API_TOKEN_ENV: &str = "LANDFORM_API_TOKEN";
pub const API_URL_ENV: &str = "LANDFORM_API_URL";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub api_token: String,
    pub user_agent: String,
    /// Limit for a single HTTP request; reconciliation deadlines come from the context
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiClientError::InvalidConfig(format!(
                "API URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(ApiClientError::InvalidConfig(
                "API token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_token,
            user_agent: format!("landform/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(60),
        })
    }

    /// Read `LANDFORM_API_TOKEN` (required) and `LANDFORM_API_URL`
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var(API_TOKEN_ENV)
            .map_err(|_| ApiClientError::MissingEnvVar(API_TOKEN_ENV.to_string()))?;
        let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url, api_token)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
