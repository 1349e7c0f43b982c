//! Reconciliation services
//!
//! One service per entity. Each operation validates its parameters by
//! building the domain value, then runs repository calls and status waits
//! strictly one after the other. Errors are returned unchanged in kind; the
//! only local recovery is that deleting an absent resource succeeds.

mod cluster;
mod deployment;
mod deployment_stage;
mod job;
mod organization;

pub use cluster::ClusterService;
pub use deployment::DeploymentService;
pub use deployment_stage::DeploymentStageService;
pub use job::JobService;
pub use organization::OrganizationService;

use crate::context::Context;
use crate::error::{ResourceKind, Result};
use crate::state::State;
use crate::wait::{self, Poll, PollPolicy, WaitError};
use std::future::Future;

/// Poll `get_status` until it reports one of `targets`
pub(crate) async fn wait_for_state<F, Fut>(
    ctx: &Context,
    policy: &PollPolicy,
    resource: ResourceKind,
    id: &str,
    targets: &[State],
    mut get_status: F,
) -> Result<State>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<State>>,
{
    tracing::debug!(%resource, id, ?targets, "waiting for state");
    wait::wait_for(ctx, policy, || {
        let status = get_status();
        async move { wait::until_state(status.await?, targets, resource, id) }
    })
    .await
    .map_err(|e| e.into_cloud_error(resource, id))
}

/// Poll `get_status` until no transition is in progress
///
/// Failure states count as settled here; callers decide what to do next.
pub(crate) async fn wait_for_terminal<F, Fut>(
    ctx: &Context,
    policy: &PollPolicy,
    resource: ResourceKind,
    id: &str,
    mut get_status: F,
) -> Result<State>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<State>>,
{
    tracing::debug!(%resource, id, "waiting for a terminal state");
    wait::wait_for(ctx, policy, || {
        let status = get_status();
        async move { Ok(wait::until_terminal(status.await?)) }
    })
    .await
    .map_err(|e| e.into_cloud_error(resource, id))
}

/// Poll `get_status` until the resource reports DELETED or disappears
pub(crate) async fn wait_for_deletion<F, Fut>(
    ctx: &Context,
    policy: &PollPolicy,
    resource: ResourceKind,
    id: &str,
    mut get_status: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<State>>,
{
    tracing::debug!(%resource, id, "waiting for deletion");
    wait::wait_for(ctx, policy, || {
        let status = get_status();
        async move {
            match status.await {
                Ok(state) => wait::until_state(state, &[State::Deleted], resource, id),
                Err(e) if e.is_not_found() => Ok(Poll::Ready(State::Deleted)),
                Err(e) => Err(e),
            }
        }
    })
    .await
    .map(|_| ())
    .map_err(|e: WaitError| e.into_cloud_error(resource, id))
}

/// Map a not-found failure of a delete-path call to success
pub(crate) fn absent_is_deleted(result: Result<()>, resource: ResourceKind, id: &str) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            tracing::warn!(%resource, id, "resource already absent, treating as deleted");
            Ok(())
        }
        other => other,
    }
}
