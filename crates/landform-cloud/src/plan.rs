//! Cluster update planning
//!
//! The remote system decides on its own whether a cluster update changed
//! anything, and it does not look at features or the routing table when it
//! does. A change to either therefore marks the plan as a forced update.

use crate::error::Result;
use crate::model::{Cluster, ClusterParams, ClusterRequest, RoutingTable};
use crate::state::{DesiredState, State};
use std::collections::BTreeMap;

/// Call needed to move a cluster towards its desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Already in the desired state
    None,
    Deploy,
    /// Re-apply the infrastructure of an already deployed cluster
    Update,
    Stop,
}

impl std::fmt::Display for StatusAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusAction::None => write!(f, "no-op"),
            StatusAction::Deploy => write!(f, "deploy"),
            StatusAction::Update => write!(f, "update"),
            StatusAction::Stop => write!(f, "stop"),
        }
    }
}

/// Everything a cluster create or update has to do, derived from the desired
/// parameters and the last known state
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterUpsertPlan {
    pub request: ClusterRequest,
    pub desired_state: DesiredState,
    pub features_changed: bool,
    pub routing_table_changed: bool,
    /// No prior state, or the credentials changed
    pub specify_cloud_provider: bool,
    pub edit_routing_table: bool,
    pub edit_advanced_settings: bool,
}

impl ClusterUpsertPlan {
    pub fn new(desired: &ClusterParams, prior: Option<&Cluster>) -> Result<Self> {
        let features = desired.normalized_features()?;
        let features_changed = has_features_diff(&features, prior.map(|c| &c.features));
        let routing_table_changed =
            has_routing_table_diff(&desired.routing_table, prior.map(|c| &c.routing_table));
        let force_update = features_changed || routing_table_changed;

        let specify_cloud_provider = match prior {
            None => true,
            Some(prior) => prior.credentials_id != desired.credentials_id,
        };

        Ok(Self {
            request: ClusterRequest::new(desired, force_update)?,
            desired_state: desired.desired_state,
            features_changed,
            routing_table_changed,
            specify_cloud_provider,
            edit_routing_table: !desired.routing_table.is_empty() || routing_table_changed,
            edit_advanced_settings: !desired.advanced_settings.is_empty(),
        })
    }

    pub fn force_update(&self) -> bool {
        self.request.force_update
    }

    /// Pick the lifecycle call for a cluster currently in `current`
    pub fn status_action(&self, current: State) -> StatusAction {
        match self.desired_state {
            DesiredState::Deployed => {
                if !DesiredState::Deployed.is_satisfied_by(current) {
                    StatusAction::Deploy
                } else if self.force_update() {
                    StatusAction::Update
                } else {
                    StatusAction::None
                }
            }
            DesiredState::Stopped if !DesiredState::Stopped.is_satisfied_by(current) => {
                StatusAction::Stop
            }
            _ => StatusAction::None,
        }
    }
}

impl std::fmt::Display for ClusterUpsertPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "force_update={}, features changed={}, routing table changed={}, target={}",
            self.force_update(),
            self.features_changed,
            self.routing_table_changed,
            self.desired_state
        )
    }
}

/// Keyed comparison of feature sets
///
/// Without prior state, any desired feature counts as a change.
pub fn has_features_diff(
    desired: &BTreeMap<String, String>,
    prior: Option<&BTreeMap<String, String>>,
) -> bool {
    match prior {
        None => !desired.is_empty(),
        Some(prior) => desired != prior,
    }
}

/// Destination-keyed, order-insensitive comparison of routing tables
pub fn has_routing_table_diff(desired: &RoutingTable, prior: Option<&RoutingTable>) -> bool {
    match prior {
        None => !desired.is_empty(),
        Some(prior) => !desired.same_routes(prior),
    }
}
