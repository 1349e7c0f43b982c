//! Adapter construction errors
//!
//! Failures of individual API calls are reported through the core error
//! taxonomy ([`landform_cloud::ApiError`]); this type only covers setting the
//! adapter up.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiClientError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ApiClientError>;
