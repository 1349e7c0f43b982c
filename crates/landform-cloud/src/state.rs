//! Remote lifecycle states
//!
//! The remote platform reports the state of clusters and environments as one
//! of the values of [`State`]. Each value is either *transitional* (the remote
//! system is still working on it) or *terminal* (no automatic transition is in
//! progress). Terminal states are further split into success and failure.
//!
//! | state                                   | class        |
//! |-----------------------------------------|--------------|
//! | `QUEUED`, `*_QUEUED`, `*ING`, `UNKNOWN` | transitional |
//! | `*_ERROR`                               | failure      |
//! | everything else                         | terminal     |
//!
//! Clusters only ever settle in `DEPLOYED`, `STOPPED`, `DELETED` or a failure
//! state; environments additionally report `RUNNING`, `READY`, `RESTARTED` and
//! `CANCELED`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// State reported by the remote system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Queued,
    Building,
    BuildError,
    DeploymentQueued,
    Deploying,
    DeploymentError,
    Deployed,
    Running,
    Ready,
    StopQueued,
    Stopping,
    StopError,
    Stopped,
    DeleteQueued,
    Deleting,
    DeleteError,
    Deleted,
    RestartQueued,
    Restarting,
    RestartError,
    Restarted,
    Canceling,
    Canceled,
    #[serde(other)]
    Unknown,
}

const ALL_STATES: [State; 24] = [
    State::Queued,
    State::Building,
    State::BuildError,
    State::DeploymentQueued,
    State::Deploying,
    State::DeploymentError,
    State::Deployed,
    State::Running,
    State::Ready,
    State::StopQueued,
    State::Stopping,
    State::StopError,
    State::Stopped,
    State::DeleteQueued,
    State::Deleting,
    State::DeleteError,
    State::Deleted,
    State::RestartQueued,
    State::Restarting,
    State::RestartError,
    State::Restarted,
    State::Canceling,
    State::Canceled,
    State::Unknown,
];

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Queued => "QUEUED",
            State::Building => "BUILDING",
            State::BuildError => "BUILD_ERROR",
            State::DeploymentQueued => "DEPLOYMENT_QUEUED",
            State::Deploying => "DEPLOYING",
            State::DeploymentError => "DEPLOYMENT_ERROR",
            State::Deployed => "DEPLOYED",
            State::Running => "RUNNING",
            State::Ready => "READY",
            State::StopQueued => "STOP_QUEUED",
            State::Stopping => "STOPPING",
            State::StopError => "STOP_ERROR",
            State::Stopped => "STOPPED",
            State::DeleteQueued => "DELETE_QUEUED",
            State::Deleting => "DELETING",
            State::DeleteError => "DELETE_ERROR",
            State::Deleted => "DELETED",
            State::RestartQueued => "RESTART_QUEUED",
            State::Restarting => "RESTARTING",
            State::RestartError => "RESTART_ERROR",
            State::Restarted => "RESTARTED",
            State::Canceling => "CANCELING",
            State::Canceled => "CANCELED",
            State::Unknown => "UNKNOWN",
        }
    }

    /// The remote system is still moving the resource
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            State::Queued
                | State::Building
                | State::DeploymentQueued
                | State::Deploying
                | State::StopQueued
                | State::Stopping
                | State::DeleteQueued
                | State::Deleting
                | State::RestartQueued
                | State::Restarting
                | State::Canceling
                | State::Unknown
        )
    }

    /// No automatic transition is in progress (success or failure)
    pub fn is_terminal(&self) -> bool {
        !self.is_transitional()
    }

    /// The last transition failed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            State::BuildError
                | State::DeploymentError
                | State::StopError
                | State::DeleteError
                | State::RestartError
        )
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = std::convert::Infallible;

    /// Unrecognised values map to [`State::Unknown`], which is transitional
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Ok(ALL_STATES
            .iter()
            .copied()
            .find(|state| state.as_str() == normalized)
            .unwrap_or(State::Unknown))
    }
}

/// Lifecycle state a caller wants a resource to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredState {
    Deployed,
    Stopped,
    Restarted,
    Deleted,
}

impl DesiredState {
    /// Parse a desired state (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPLOYED" => Some(Self::Deployed),
            "STOPPED" => Some(Self::Stopped),
            "RESTARTED" => Some(Self::Restarted),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployed => "DEPLOYED",
            Self::Stopped => "STOPPED",
            Self::Restarted => "RESTARTED",
            Self::Deleted => "DELETED",
        }
    }

    /// Only DEPLOYED and STOPPED may be requested when creating a resource
    pub fn allowed_at_creation(&self) -> bool {
        matches!(self, Self::Deployed | Self::Stopped)
    }

    /// Remote states that satisfy this desired state
    pub fn target_states(&self) -> &'static [State] {
        match self {
            Self::Deployed => &[State::Deployed, State::Running],
            Self::Stopped => &[State::Stopped],
            Self::Restarted => &[State::Restarted, State::Deployed, State::Running],
            Self::Deleted => &[State::Deleted],
        }
    }

    pub fn is_satisfied_by(&self, state: State) -> bool {
        self.target_states().contains(&state)
    }
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_is_classified_once() {
        for state in ALL_STATES {
            assert_ne!(state.is_transitional(), state.is_terminal(), "{state}");
            if state.is_failure() {
                assert!(state.is_terminal(), "{state} failure must be terminal");
            }
        }
    }

    #[test]
    fn test_parse_state() {
        assert_eq!("DEPLOYED".parse::<State>().unwrap(), State::Deployed);
        assert_eq!("stop_error".parse::<State>().unwrap(), State::StopError);
        assert_eq!("SOMETHING_NEW".parse::<State>().unwrap(), State::Unknown);
        assert!(State::Unknown.is_transitional());
    }

    #[test]
    fn test_state_serde_uses_wire_names() {
        let json = serde_json::to_string(&State::DeploymentQueued).unwrap();
        assert_eq!(json, "\"DEPLOYMENT_QUEUED\"");

        let state: State = serde_json::from_str("\"WAITING_RUNNING\"").unwrap();
        assert_eq!(state, State::Unknown);
    }

    #[test]
    fn test_desired_state_targets() {
        assert!(DesiredState::Deployed.is_satisfied_by(State::Running));
        assert!(!DesiredState::Deployed.is_satisfied_by(State::Stopped));
        assert!(DesiredState::Deleted.is_satisfied_by(State::Deleted));
        assert!(DesiredState::Deployed.allowed_at_creation());
        assert!(!DesiredState::Restarted.allowed_at_creation());
        assert!(!DesiredState::Deleted.allowed_at_creation());
    }

    #[test]
    fn test_desired_state_parse() {
        assert_eq!(DesiredState::parse("deployed"), Some(DesiredState::Deployed));
        assert_eq!(DesiredState::parse("RUNNING"), None);
    }
}
