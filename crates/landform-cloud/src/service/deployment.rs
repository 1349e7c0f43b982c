use super::{absent_is_deleted, wait_for_deletion, wait_for_state, wait_for_terminal};
use crate::context::Context;
use crate::error::{CloudError, ResourceKind, Result};
use crate::model::{Deployment, DeploymentParams};
use crate::repository::EnvironmentRepository;
use crate::state::{DesiredState, State};
use crate::wait::{self, Poll, PollPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::info;

/// Polls after an update call during which an unchanged target state is
/// taken as not yet picked up by the platform
const PICKUP_POLLS: u32 = 3;

/// Drives an environment to the lifecycle state named by a [`Deployment`]
pub struct DeploymentService {
    environments: Arc<dyn EnvironmentRepository>,
    policy: PollPolicy,
}

impl DeploymentService {
    pub fn new(environments: Arc<dyn EnvironmentRepository>, policy: PollPolicy) -> Self {
        Self {
            environments,
            policy,
        }
    }

    /// Only DEPLOYED and STOPPED are accepted; a STOPPED creation issues no call
    pub async fn create(&self, ctx: &Context, params: DeploymentParams) -> Result<Deployment> {
        let mut deployment = Deployment::new(params)?;
        if !deployment.desired_state.allowed_at_creation() {
            return Err(CloudError::DesiredStateForbiddenAtCreation(
                deployment.desired_state,
            ));
        }

        let environment_id = deployment.environment();
        if deployment.desired_state == DesiredState::Deployed {
            info!(environment = %environment_id, "deploying environment");
            self.environments.deploy(ctx, &environment_id).await?;
            deployment.state = Some(self.wait_for_desired(ctx, &deployment).await?);
        }

        Ok(deployment)
    }

    /// Validate the parameters and read the environment's current state
    pub async fn get(&self, ctx: &Context, params: DeploymentParams) -> Result<Deployment> {
        let mut deployment = Deployment::new(params)?;
        let state = self
            .environments
            .get_status(ctx, &deployment.environment())
            .await?;
        tracing::debug!(environment = %deployment.environment_id, %state, "read environment status");
        deployment.state = Some(state);
        Ok(deployment)
    }

    /// Settle any running transition, then issue the call for the desired state
    ///
    /// An environment already in a target state (e.g. RUNNING before a
    /// redeploy) only counts as done once a transition has been observed or
    /// after a few polls without one.
    pub async fn update(&self, ctx: &Context, params: DeploymentParams) -> Result<Deployment> {
        let mut deployment = Deployment::new(params)?;
        let environment_id = deployment.environment();

        self.wait_for_terminal(ctx, &environment_id).await?;

        match deployment.desired_state {
            DesiredState::Deployed => {
                info!(environment = %environment_id, version = ?deployment.version, "redeploying environment");
                self.environments.redeploy(ctx, &environment_id).await?;
            }
            DesiredState::Stopped => {
                info!(environment = %environment_id, "stopping environment");
                self.environments.stop(ctx, &environment_id).await?;
            }
            DesiredState::Restarted => {
                info!(environment = %environment_id, "restarting environment");
                self.environments.restart(ctx, &environment_id).await?;
            }
            DesiredState::Deleted => {
                return Err(CloudError::invalid(
                    ResourceKind::Deployment,
                    "desired_state DELETED is reached through delete, not update",
                ));
            }
        }

        deployment.state = Some(self.wait_for_pickup(ctx, &deployment).await?);
        Ok(deployment)
    }

    /// Delete the environment; an environment that is already gone is a success
    pub async fn delete(&self, ctx: &Context, params: DeploymentParams) -> Result<()> {
        let deployment = Deployment::new(params)?;
        let environment_id = deployment.environment();

        if let Err(e) = self.wait_for_terminal(ctx, &environment_id).await {
            return absent_is_deleted(Err(e), ResourceKind::Environment, &environment_id);
        }

        info!(environment = %environment_id, "deleting environment");
        let deleted = self.environments.delete(ctx, &environment_id).await;
        absent_is_deleted(deleted, ResourceKind::Environment, &environment_id)?;

        let environments = &self.environments;
        wait_for_deletion(
            ctx,
            &self.policy,
            ResourceKind::Environment,
            &environment_id,
            || environments.get_status(ctx, &environment_id),
        )
        .await
    }

    async fn wait_for_desired(&self, ctx: &Context, deployment: &Deployment) -> Result<State> {
        let environment_id = deployment.environment();
        let environments = &self.environments;
        let state = wait_for_state(
            ctx,
            &self.policy,
            ResourceKind::Environment,
            &environment_id,
            deployment.desired_state.target_states(),
            || environments.get_status(ctx, &environment_id),
        )
        .await?;
        info!(environment = %environment_id, %state, "environment reached desired state");
        Ok(state)
    }

    async fn wait_for_pickup(&self, ctx: &Context, deployment: &Deployment) -> Result<State> {
        let environment_id = deployment.environment();
        let id = environment_id.as_str();
        let targets = deployment.desired_state.target_states();
        let environments = &self.environments;
        let polls = &AtomicU32::new(0);
        let moved = &AtomicBool::new(false);

        let state = wait::wait_for(ctx, &self.policy, || {
            let status = environments.get_status(ctx, id);
            async move {
                let state = status.await?;
                let attempt = polls.fetch_add(1, Ordering::Relaxed) + 1;
                if state.is_transitional() {
                    moved.store(true, Ordering::Relaxed);
                }
                match wait::until_state(state, targets, ResourceKind::Environment, id)? {
                    Poll::Ready(state)
                        if !moved.load(Ordering::Relaxed) && attempt < PICKUP_POLLS =>
                    {
                        Ok(Poll::Pending(state))
                    }
                    outcome => Ok(outcome),
                }
            }
        })
        .await
        .map_err(|e| e.into_cloud_error(ResourceKind::Environment, id))?;

        info!(environment = %id, %state, "environment reached desired state");
        Ok(state)
    }

    async fn wait_for_terminal(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        let environments = &self.environments;
        wait_for_terminal(
            ctx,
            &self.policy,
            ResourceKind::Environment,
            environment_id,
            || environments.get_status(ctx, environment_id),
        )
        .await
        .map(|_| ())
    }
}
