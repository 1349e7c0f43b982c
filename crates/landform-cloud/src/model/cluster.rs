//! Kubernetes cluster managed by the platform

use super::routing_table::RoutingTable;
use crate::error::{CloudError, ResourceKind, Result};
use crate::state::{DesiredState, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature key for the VPC subnet a cluster is placed in
pub const FEATURE_VPC_SUBNET: &str = "vpc_subnet";

/// Cloud provider hosting a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudProvider {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "SCW")]
    Scaleway,
    #[serde(rename = "GCP")]
    Gcp,
    #[serde(rename = "DO")]
    DigitalOcean,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Scaleway => "SCW",
            CloudProvider::Gcp => "GCP",
            CloudProvider::DigitalOcean => "DO",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KubernetesMode {
    #[default]
    Managed,
    K3s,
}

/// Credentials and region registered for a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProviderInfo {
    pub cloud_provider: CloudProvider,
    pub credentials_id: String,
    pub region: String,
}

/// Free-form advanced settings, keyed by setting name
pub type AdvancedSettings = serde_json::Map<String, serde_json::Value>;

/// A cluster as known by the remote system, sub-resources included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cloud_provider: CloudProvider,
    pub region: String,
    /// Empty until the cloud-provider info has been read back
    #[serde(default)]
    pub credentials_id: String,
    #[serde(default)]
    pub kubernetes_mode: KubernetesMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    pub min_running_nodes: u32,
    pub max_running_nodes: u32,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
    #[serde(default)]
    pub routing_table: RoutingTable,
    #[serde(default)]
    pub advanced_settings: AdvancedSettings,
    pub state: State,
}

impl Cluster {
    pub fn is_deployed(&self) -> bool {
        DesiredState::Deployed.is_satisfied_by(self.state)
    }

    pub fn is_stopped(&self) -> bool {
        DesiredState::Stopped.is_satisfied_by(self.state)
    }
}

/// Caller-supplied description of the desired cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    pub organization_id: String,
    pub credentials_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cloud_provider: CloudProvider,
    pub region: String,
    #[serde(default)]
    pub kubernetes_mode: KubernetesMode,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default = "default_min_running_nodes")]
    pub min_running_nodes: u32,
    #[serde(default = "default_max_running_nodes")]
    pub max_running_nodes: u32,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
    #[serde(default)]
    pub routing_table: RoutingTable,
    #[serde(default)]
    pub advanced_settings: AdvancedSettings,
    #[serde(default = "default_desired_state")]
    pub desired_state: DesiredState,
}

fn default_min_running_nodes() -> u32 {
    3
}

fn default_max_running_nodes() -> u32 {
    10
}

fn default_desired_state() -> DesiredState {
    DesiredState::Deployed
}

impl ClusterParams {
    /// Check shape and sizing; clusters only settle in DEPLOYED or STOPPED
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("organization_id", &self.organization_id),
            ("credentials_id", &self.credentials_id),
            ("name", &self.name),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{} is required", field)));
            }
        }
        if self.min_running_nodes == 0 {
            return Err(invalid("min_running_nodes must be at least 1"));
        }
        if self.max_running_nodes < self.min_running_nodes {
            return Err(invalid(format!(
                "max_running_nodes ({}) must be >= min_running_nodes ({})",
                self.max_running_nodes, self.min_running_nodes
            )));
        }
        if !matches!(
            self.desired_state,
            DesiredState::Deployed | DesiredState::Stopped
        ) {
            return Err(invalid(format!(
                "desired_state must be DEPLOYED or STOPPED, got {}",
                self.desired_state
            )));
        }
        self.normalized_features()?;
        self.routing_table.validate()
    }

    /// Feature map keyed the way the platform reports it back (lower case)
    ///
    /// Keys that collide once lower-cased are rejected.
    pub fn normalized_features(&self) -> Result<BTreeMap<String, String>> {
        let mut features = BTreeMap::new();
        for (key, value) in &self.features {
            let normalized = key.trim().to_ascii_lowercase();
            if normalized.is_empty() {
                return Err(invalid("feature keys must not be empty"));
            }
            if features.insert(normalized, value.clone()).is_some() {
                return Err(invalid(format!(
                    "feature '{}' is given more than once (keys are case-insensitive)",
                    key
                )));
            }
        }
        Ok(features)
    }

    pub fn cloud_provider_info(&self) -> CloudProviderInfo {
        CloudProviderInfo {
            cloud_provider: self.cloud_provider,
            credentials_id: self.credentials_id.clone(),
            region: self.region.clone(),
        }
    }
}

/// Body of a cluster create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cloud_provider: CloudProvider,
    pub region: String,
    pub kubernetes_mode: KubernetesMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    pub min_running_nodes: u32,
    pub max_running_nodes: u32,
    pub features: BTreeMap<String, String>,
    /// Ask the remote system to apply the update even if it sees no change
    pub force_update: bool,
}

impl ClusterRequest {
    pub fn new(params: &ClusterParams, force_update: bool) -> Result<Self> {
        params.validate()?;
        let features = params.normalized_features()?;
        Ok(Self {
            name: params.name.clone(),
            description: params.description.clone(),
            cloud_provider: params.cloud_provider,
            region: params.region.clone(),
            kubernetes_mode: params.kubernetes_mode,
            instance_type: params.instance_type.clone(),
            min_running_nodes: params.min_running_nodes,
            max_running_nodes: params.max_running_nodes,
            features,
            force_update,
        })
    }
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::invalid(ResourceKind::Cluster, reason)
}
