//! Cluster routing table
//!
//! Routes are identified by their destination; the table behaves as a set
//! keyed by destination and its order carries no meaning.

use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRoute {
    /// CIDR block, unique within a table
    pub destination: String,
    pub target: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    routes: Vec<ClusterRoute>,
}

impl RoutingTable {
    pub fn new(routes: Vec<ClusterRoute>) -> Result<Self> {
        let table = Self { routes };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeMap::new();
        for route in &self.routes {
            if route.destination.trim().is_empty() {
                return Err(invalid("route destination is required"));
            }
            if route.target.trim().is_empty() {
                return Err(invalid(format!(
                    "route '{}' has no target",
                    route.destination
                )));
            }
            if seen.insert(route.destination.as_str(), ()).is_some() {
                return Err(invalid(format!(
                    "duplicate route destination '{}'",
                    route.destination
                )));
            }
        }
        Ok(())
    }

    pub fn routes(&self) -> &[ClusterRoute] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// `destination -> (target, description)`
    pub fn by_destination(&self) -> BTreeMap<&str, (&str, &str)> {
        self.routes
            .iter()
            .map(|r| {
                (
                    r.destination.as_str(),
                    (r.target.as_str(), r.description.as_str()),
                )
            })
            .collect()
    }

    /// Order-insensitive comparison keyed by destination
    pub fn same_routes(&self, other: &RoutingTable) -> bool {
        self.by_destination() == other.by_destination()
    }
}

impl From<RoutingTable> for Vec<ClusterRoute> {
    fn from(table: RoutingTable) -> Self {
        table.routes
    }
}

fn invalid(reason: impl Into<String>) -> CloudError {
    CloudError::invalid(ResourceKind::ClusterRoutingTable, reason)
}
