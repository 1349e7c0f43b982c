//! Landform cloud core
//!
//! Desired-state reconciliation for platform resources: clusters,
//! environment deployments, jobs, deployment stages and organizations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │             landform CLI / orchestrator          │
//! └─────────────────┬───────────────────────────────┘
//!                   │ params structs
//! ┌─────────────────▼───────────────────────────────┐
//! │                 landform-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  service::*  (create / get / update /    │   │
//! │  │               delete per entity)         │   │
//! │  └───────┬───────────────────┬──────────────┘   │
//! │  ┌───────▼──────┐   ┌────────▼──────────┐       │
//! │  │ plan / model │   │ wait (poller)     │       │
//! │  └──────────────┘   └────────┬──────────┘       │
//! │  ┌───────────────────────────▼──────────────┐   │
//! │  │  repository::*  traits                   │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼──────────┐     ┌────────▼────────┐
//! │ landform-cloud-  │     │ testing::       │
//! │ api (REST)       │     │ FakeCloud       │
//! └──────────────────┘     └─────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod model;
pub mod plan;
pub mod repository;
pub mod service;
pub mod state;
pub mod wait;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use context::{CancelHandle, Context, Interrupted};
pub use error::{ApiError, Cause, CloudError, Operation, ResourceKind, Result};
pub use plan::{ClusterUpsertPlan, StatusAction};
pub use repository::{
    ClusterRepository, DeploymentStageRepository, EnvironmentRepository, JobRepository,
    OrganizationRepository, VariableRepository,
};
pub use service::{
    ClusterService, DeploymentService, DeploymentStageService, JobService, OrganizationService,
};
pub use state::{DesiredState, State};
pub use wait::{Poll, PollPolicy, WaitError, wait_for};
