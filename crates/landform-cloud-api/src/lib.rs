//! REST adapter for the landform platform API
//!
//! [`ApiClient`] implements every repository trait of `landform-cloud`
//! against the platform's HTTP API, and [`Provider`] wires the
//! reconciliation services on top of it.
//!
//! # Configuration
//!
//! - `LANDFORM_API_TOKEN`: API token (required)
//! - `LANDFORM_API_URL`: API base URL (defaults to `https://api.landform.dev`)
//!
//! # Example
//!
//! ```ignore
//! use landform_cloud::{Context, PollPolicy};
//! use landform_cloud_api::{ApiConfig, Provider};
//!
//! let provider = Provider::new(ApiConfig::from_env()?, PollPolicy::default())?;
//! let org = provider.organizations.get(&Context::background(), "org-1").await?;
//! ```

mod client;
pub mod config;
mod cluster;
mod deployment_stage;
mod environment;
pub mod error;
mod job;
mod organization;
pub mod provider;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiClientError, Result};
pub use provider::Provider;

#[cfg(test)]
mod tests {
    use super::*;
    use landform_cloud::{
        ClusterRepository, DeploymentStageRepository, EnvironmentRepository, JobRepository,
        OrganizationRepository, VariableRepository,
    };

    fn assert_repositories<
        R: ClusterRepository
            + EnvironmentRepository
            + JobRepository
            + VariableRepository
            + DeploymentStageRepository
            + OrganizationRepository,
    >() {
    }

    #[test]
    fn test_client_implements_every_repository() {
        assert_repositories::<ApiClient>();
    }
}
