//! In-memory repositories for tests
//!
//! [`FakeCloud`] implements every repository trait on top of a shared map of
//! resources. Each call is appended to a [`CallLog`] as `"<call> <args>"`
//! (for example `"job.create env-1"`), so tests can assert which remote calls
//! were issued and in what order.
//!
//! Statuses are scripted per resource id: every `get_status` pops the next
//! scripted state and the last one sticks. Lifecycle calls (deploy, stop, ...)
//! replace the script with a short transition, which tests can override with
//! [`FakeCloud::transition`].

use crate::context::Context;
use crate::error::{ApiError, Cause, Operation, ResourceKind, Result};
use crate::model::{
    AdvancedSettings, CloudProviderInfo, Cluster, ClusterRequest, DeploymentStage,
    DeploymentStageRequest, Job, JobUpsertRequest, Organization, OrganizationParams,
    RoutingTable, Variable, VariableKind, VariableScope, VariableUpsert,
};
use crate::repository::{
    ClusterRepository, DeploymentStageRepository, EnvironmentRepository, JobRepository,
    OrganizationRepository, VariableRepository,
};
use crate::state::State;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Ordered record of repository calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        lock(&self.calls).push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    /// Calls whose name (the part before the first space) is `name`
    pub fn count(&self, name: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.split(' ').next() == Some(name))
            .count()
    }

    /// Calls that are not status reads
    pub fn mutations(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| !c.contains(".get") && !c.contains(".list"))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    clusters: HashMap<String, Cluster>,
    cloud_provider_info: HashMap<String, CloudProviderInfo>,
    routing_tables: HashMap<String, RoutingTable>,
    advanced_settings: HashMap<String, AdvancedSettings>,
    statuses: HashMap<String, VecDeque<State>>,
    transitions: HashMap<String, Vec<State>>,
    jobs: HashMap<String, Job>,
    variables: HashMap<(VariableKind, String), Vec<Variable>>,
    stages: HashMap<String, DeploymentStage>,
    service_stages: HashMap<String, String>,
    organizations: HashMap<String, Organization>,
    failures: HashMap<String, Cause>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn status(&mut self, id: &str) -> Option<State> {
        let script = self.statuses.get_mut(id)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        }
    }

    fn transition(&mut self, call: &str, id: &str, default: &[State]) {
        let states = self
            .transitions
            .get(call)
            .cloned()
            .unwrap_or_else(|| default.to_vec());
        self.statuses.insert(id.to_string(), states.into());
    }
}

/// In-memory implementation of every repository trait
#[derive(Clone, Default)]
pub struct FakeCloud {
    log: CallLog,
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.calls()
    }

    /// Make every call named `call` fail with `cause`
    pub fn fail(&self, call: &str, cause: Cause) {
        self.state().failures.insert(call.to_string(), cause);
    }

    /// States reported by `get_status` for `id`; the last one sticks
    pub fn script_status(&self, id: &str, states: impl IntoIterator<Item = State>) {
        self.state()
            .statuses
            .insert(id.to_string(), states.into_iter().collect());
    }

    /// States reported after the lifecycle call `call` (e.g. `"environment.deploy"`)
    pub fn transition(&self, call: &str, states: impl IntoIterator<Item = State>) {
        self.state()
            .transitions
            .insert(call.to_string(), states.into_iter().collect());
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        let mut state = self.state();
        state
            .statuses
            .insert(cluster.id.clone(), VecDeque::from([cluster.state]));
        state
            .routing_tables
            .insert(cluster.id.clone(), cluster.routing_table.clone());
        state
            .advanced_settings
            .insert(cluster.id.clone(), cluster.advanced_settings.clone());
        state.cloud_provider_info.insert(
            cluster.id.clone(),
            CloudProviderInfo {
                cloud_provider: cluster.cloud_provider,
                credentials_id: cluster.credentials_id.clone(),
                region: cluster.region.clone(),
            },
        );
        state.clusters.insert(cluster.id.clone(), cluster);
    }

    pub fn insert_job(&self, job: Job) {
        self.state().jobs.insert(job.id.clone(), job);
    }

    pub fn insert_variable(&self, kind: VariableKind, service_id: &str, variable: Variable) {
        self.state()
            .variables
            .entry((kind, service_id.to_string()))
            .or_default()
            .push(variable);
    }

    pub fn variables(&self, kind: VariableKind, service_id: &str) -> Vec<Variable> {
        self.state()
            .variables
            .get(&(kind, service_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn insert_stage(&self, stage: DeploymentStage) {
        self.state().stages.insert(stage.id.clone(), stage);
    }

    pub fn insert_organization(&self, organization: Organization) {
        self.state()
            .organizations
            .insert(organization.id.clone(), organization);
    }

    pub fn has_cluster(&self, id: &str) -> bool {
        self.state().clusters.contains_key(id)
    }

    pub fn has_job(&self, id: &str) -> bool {
        self.state().jobs.contains_key(id)
    }

    pub fn has_stage(&self, id: &str) -> bool {
        self.state().stages.contains_key(id)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    /// Record the call and return the injected failure for it, if any
    fn enter(
        &self,
        call: &str,
        args: &[&str],
        operation: Operation,
        resource: ResourceKind,
        id: &str,
    ) -> Result<MutexGuard<'_, FakeState>> {
        let mut line = call.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.log.record(line);

        let state = self.state();
        if let Some(cause) = state.failures.get(call) {
            return Err(ApiError::new(operation, resource, id, cause.clone()).into());
        }
        Ok(state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn not_found(operation: Operation, resource: ResourceKind, id: &str) -> crate::error::CloudError {
    ApiError::not_found(operation, resource, id).into()
}

#[async_trait]
impl ClusterRepository for FakeCloud {
    async fn create(
        &self,
        _ctx: &Context,
        organization_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster> {
        let mut state = self.enter(
            "cluster.create",
            &[organization_id],
            Operation::Create,
            ResourceKind::Cluster,
            &request.name,
        )?;
        let id = state.next_id("cluster");
        let cluster = Cluster {
            id: id.clone(),
            organization_id: organization_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            cloud_provider: request.cloud_provider,
            region: request.region.clone(),
            credentials_id: String::new(),
            kubernetes_mode: request.kubernetes_mode,
            instance_type: request.instance_type.clone(),
            min_running_nodes: request.min_running_nodes,
            max_running_nodes: request.max_running_nodes,
            features: request.features.clone(),
            routing_table: RoutingTable::default(),
            advanced_settings: AdvancedSettings::new(),
            state: State::Ready,
        };
        state.statuses.insert(id.clone(), VecDeque::from([State::Ready]));
        state.clusters.insert(id, cluster.clone());
        Ok(cluster)
    }

    async fn get(
        &self,
        _ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
    ) -> Result<Cluster> {
        let state = self.enter(
            "cluster.get",
            &[organization_id, cluster_id],
            Operation::Read,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        state
            .clusters
            .get(cluster_id)
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, ResourceKind::Cluster, cluster_id))
    }

    async fn update(
        &self,
        _ctx: &Context,
        organization_id: &str,
        cluster_id: &str,
        request: &ClusterRequest,
    ) -> Result<Cluster> {
        let force = if request.force_update { "force" } else { "noforce" };
        let mut state = self.enter(
            "cluster.update",
            &[cluster_id, force],
            Operation::Update,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        let cluster = state
            .clusters
            .get_mut(cluster_id)
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| not_found(Operation::Update, ResourceKind::Cluster, cluster_id))?;
        cluster.name = request.name.clone();
        cluster.description = request.description.clone();
        cluster.instance_type = request.instance_type.clone();
        cluster.min_running_nodes = request.min_running_nodes;
        cluster.max_running_nodes = request.max_running_nodes;
        cluster.features = request.features.clone();
        Ok(cluster.clone())
    }

    async fn delete(&self, _ctx: &Context, _organization_id: &str, cluster_id: &str) -> Result<()> {
        let mut state = self.enter(
            "cluster.delete",
            &[cluster_id],
            Operation::Delete,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        if state.clusters.remove(cluster_id).is_none() {
            return Err(not_found(Operation::Delete, ResourceKind::Cluster, cluster_id));
        }
        state.transition("cluster.delete", cluster_id, &[State::Deleting, State::Deleted]);
        Ok(())
    }

    async fn get_status(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
    ) -> Result<State> {
        let mut state = self.enter(
            "cluster.get_status",
            &[cluster_id],
            Operation::StatusCheck,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        state
            .status(cluster_id)
            .ok_or_else(|| not_found(Operation::StatusCheck, ResourceKind::Cluster, cluster_id))
    }

    async fn deploy(&self, _ctx: &Context, _organization_id: &str, cluster_id: &str) -> Result<()> {
        let mut state = self.enter(
            "cluster.deploy",
            &[cluster_id],
            Operation::Deploy,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        state.transition("cluster.deploy", cluster_id, &[State::Deploying, State::Deployed]);
        Ok(())
    }

    async fn stop(&self, _ctx: &Context, _organization_id: &str, cluster_id: &str) -> Result<()> {
        let mut state = self.enter(
            "cluster.stop",
            &[cluster_id],
            Operation::Stop,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        state.transition("cluster.stop", cluster_id, &[State::Stopping, State::Stopped]);
        Ok(())
    }

    async fn apply_update(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
    ) -> Result<()> {
        let mut state = self.enter(
            "cluster.apply_update",
            &[cluster_id],
            Operation::Deploy,
            ResourceKind::Cluster,
            cluster_id,
        )?;
        state.transition(
            "cluster.apply_update",
            cluster_id,
            &[State::Deploying, State::Deployed],
        );
        Ok(())
    }

    async fn get_cloud_provider_info(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
    ) -> Result<CloudProviderInfo> {
        let state = self.enter(
            "cluster.get_cloud_provider_info",
            &[cluster_id],
            Operation::Read,
            ResourceKind::ClusterCloudProvider,
            cluster_id,
        )?;
        state.cloud_provider_info.get(cluster_id).cloned().ok_or_else(|| {
            not_found(Operation::Read, ResourceKind::ClusterCloudProvider, cluster_id)
        })
    }

    async fn specify_cloud_provider_info(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
        info: &CloudProviderInfo,
    ) -> Result<()> {
        let mut state = self.enter(
            "cluster.specify_cloud_provider_info",
            &[cluster_id, info.credentials_id.as_str()],
            Operation::Update,
            ResourceKind::ClusterCloudProvider,
            cluster_id,
        )?;
        state
            .cloud_provider_info
            .insert(cluster_id.to_string(), info.clone());
        if let Some(cluster) = state.clusters.get_mut(cluster_id) {
            cluster.credentials_id = info.credentials_id.clone();
        }
        Ok(())
    }

    async fn get_routing_table(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
    ) -> Result<RoutingTable> {
        let state = self.enter(
            "cluster.get_routing_table",
            &[cluster_id],
            Operation::Read,
            ResourceKind::ClusterRoutingTable,
            cluster_id,
        )?;
        Ok(state
            .routing_tables
            .get(cluster_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn edit_routing_table(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
        table: &RoutingTable,
    ) -> Result<RoutingTable> {
        let mut state = self.enter(
            "cluster.edit_routing_table",
            &[cluster_id],
            Operation::Update,
            ResourceKind::ClusterRoutingTable,
            cluster_id,
        )?;
        state
            .routing_tables
            .insert(cluster_id.to_string(), table.clone());
        Ok(table.clone())
    }

    async fn get_advanced_settings(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
    ) -> Result<AdvancedSettings> {
        let state = self.enter(
            "cluster.get_advanced_settings",
            &[cluster_id],
            Operation::Read,
            ResourceKind::ClusterAdvancedSettings,
            cluster_id,
        )?;
        Ok(state
            .advanced_settings
            .get(cluster_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn edit_advanced_settings(
        &self,
        _ctx: &Context,
        _organization_id: &str,
        cluster_id: &str,
        settings: &AdvancedSettings,
    ) -> Result<AdvancedSettings> {
        let mut state = self.enter(
            "cluster.edit_advanced_settings",
            &[cluster_id],
            Operation::Update,
            ResourceKind::ClusterAdvancedSettings,
            cluster_id,
        )?;
        let stored = state
            .advanced_settings
            .entry(cluster_id.to_string())
            .or_default();
        for (key, value) in settings {
            stored.insert(key.clone(), value.clone());
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl EnvironmentRepository for FakeCloud {
    async fn get_status(&self, _ctx: &Context, environment_id: &str) -> Result<State> {
        let mut state = self.enter(
            "environment.get_status",
            &[environment_id],
            Operation::StatusCheck,
            ResourceKind::Environment,
            environment_id,
        )?;
        state.status(environment_id).ok_or_else(|| {
            not_found(Operation::StatusCheck, ResourceKind::Environment, environment_id)
        })
    }

    async fn deploy(&self, _ctx: &Context, environment_id: &str) -> Result<()> {
        let mut state = self.enter(
            "environment.deploy",
            &[environment_id],
            Operation::Deploy,
            ResourceKind::Environment,
            environment_id,
        )?;
        state.transition(
            "environment.deploy",
            environment_id,
            &[State::DeploymentQueued, State::Deploying, State::Deployed],
        );
        Ok(())
    }

    async fn redeploy(&self, _ctx: &Context, environment_id: &str) -> Result<()> {
        let mut state = self.enter(
            "environment.redeploy",
            &[environment_id],
            Operation::Deploy,
            ResourceKind::Environment,
            environment_id,
        )?;
        state.transition(
            "environment.redeploy",
            environment_id,
            &[State::Deploying, State::Deployed],
        );
        Ok(())
    }

    async fn stop(&self, _ctx: &Context, environment_id: &str) -> Result<()> {
        let mut state = self.enter(
            "environment.stop",
            &[environment_id],
            Operation::Stop,
            ResourceKind::Environment,
            environment_id,
        )?;
        state.transition(
            "environment.stop",
            environment_id,
            &[State::Stopping, State::Stopped],
        );
        Ok(())
    }

    async fn restart(&self, _ctx: &Context, environment_id: &str) -> Result<()> {
        let mut state = self.enter(
            "environment.restart",
            &[environment_id],
            Operation::Deploy,
            ResourceKind::Environment,
            environment_id,
        )?;
        state.transition(
            "environment.restart",
            environment_id,
            &[State::Restarting, State::Restarted],
        );
        Ok(())
    }

    async fn delete(&self, _ctx: &Context, environment_id: &str) -> Result<()> {
        let mut state = self.enter(
            "environment.delete",
            &[environment_id],
            Operation::Delete,
            ResourceKind::Environment,
            environment_id,
        )?;
        if !state.statuses.contains_key(environment_id) {
            return Err(not_found(
                Operation::Delete,
                ResourceKind::Environment,
                environment_id,
            ));
        }
        state.transition(
            "environment.delete",
            environment_id,
            &[State::Deleting, State::Deleted],
        );
        Ok(())
    }
}

#[async_trait]
impl JobRepository for FakeCloud {
    async fn create(
        &self,
        _ctx: &Context,
        environment_id: &str,
        request: &JobUpsertRequest,
    ) -> Result<Job> {
        let mut state = self.enter(
            "job.create",
            &[environment_id],
            Operation::Create,
            ResourceKind::Job,
            &request.name,
        )?;
        let id = state.next_id("job");
        let job = Job {
            id: id.clone(),
            environment_id: environment_id.to_string(),
            name: request.name.clone(),
            cpu: request.cpu.unwrap_or(500),
            memory: request.memory.unwrap_or(512),
            max_nb_restart: request.max_nb_restart.unwrap_or(0),
            max_duration_seconds: request.max_duration_seconds.unwrap_or(300),
            auto_preview: request.auto_preview.unwrap_or(false),
            port: request.port,
            source: request.source.clone(),
            schedule: request.schedule.clone(),
            environment_variables: Vec::new(),
            built_in_environment_variables: Vec::new(),
            secrets: Vec::new(),
            internal_host: Some(format!("{}.internal", id)),
            external_host: request.port.map(|_| format!("{}.example.app", id)),
            deployment_stage_id: None,
        };
        state.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get(&self, _ctx: &Context, job_id: &str) -> Result<Job> {
        let state = self.enter(
            "job.get",
            &[job_id],
            Operation::Read,
            ResourceKind::Job,
            job_id,
        )?;
        state
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, ResourceKind::Job, job_id))
    }

    async fn update(
        &self,
        _ctx: &Context,
        job_id: &str,
        request: &JobUpsertRequest,
    ) -> Result<Job> {
        let mut state = self.enter(
            "job.update",
            &[job_id],
            Operation::Update,
            ResourceKind::Job,
            job_id,
        )?;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| not_found(Operation::Update, ResourceKind::Job, job_id))?;
        job.name = request.name.clone();
        if let Some(cpu) = request.cpu {
            job.cpu = cpu;
        }
        if let Some(memory) = request.memory {
            job.memory = memory;
        }
        job.port = request.port;
        job.source = request.source.clone();
        job.schedule = request.schedule.clone();
        Ok(job.clone())
    }

    async fn delete(&self, _ctx: &Context, job_id: &str) -> Result<()> {
        let mut state = self.enter(
            "job.delete",
            &[job_id],
            Operation::Delete,
            ResourceKind::Job,
            job_id,
        )?;
        state
            .jobs
            .remove(job_id)
            .map(|_| ())
            .ok_or_else(|| not_found(Operation::Delete, ResourceKind::Job, job_id))
    }
}

fn kind_name(kind: VariableKind) -> &'static str {
    match kind {
        VariableKind::EnvironmentVariable => "env",
        VariableKind::Secret => "secret",
    }
}

#[async_trait]
impl VariableRepository for FakeCloud {
    async fn list(
        &self,
        _ctx: &Context,
        kind: VariableKind,
        service_id: &str,
    ) -> Result<Vec<Variable>> {
        let state = self.enter(
            "variable.list",
            &[kind_name(kind), service_id],
            Operation::Read,
            kind.resource(),
            service_id,
        )?;
        let mut variables = state
            .variables
            .get(&(kind, service_id.to_string()))
            .cloned()
            .unwrap_or_default();
        if kind == VariableKind::Secret {
            for variable in &mut variables {
                variable.value = None;
            }
        }
        Ok(variables)
    }

    async fn create(
        &self,
        _ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable> {
        let mut state = self.enter(
            "variable.create",
            &[kind_name(kind), service_id, request.key.as_str()],
            Operation::Create,
            kind.resource(),
            &request.key,
        )?;
        let variable = Variable {
            id: state.next_id(kind_name(kind)),
            key: request.key.clone(),
            value: Some(request.value.clone()),
            value_digest: None,
            scope: VariableScope::Job,
        };
        state
            .variables
            .entry((kind, service_id.to_string()))
            .or_default()
            .push(variable.clone());
        Ok(variable)
    }

    async fn update(
        &self,
        _ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
        request: &VariableUpsert,
    ) -> Result<Variable> {
        let mut state = self.enter(
            "variable.update",
            &[kind_name(kind), service_id, request.key.as_str()],
            Operation::Update,
            kind.resource(),
            variable_id,
        )?;
        let variable = state
            .variables
            .get_mut(&(kind, service_id.to_string()))
            .and_then(|vars| vars.iter_mut().find(|v| v.id == variable_id))
            .ok_or_else(|| not_found(Operation::Update, kind.resource(), variable_id))?;
        variable.value = Some(request.value.clone());
        Ok(variable.clone())
    }

    async fn delete(
        &self,
        _ctx: &Context,
        kind: VariableKind,
        service_id: &str,
        variable_id: &str,
    ) -> Result<()> {
        let mut state = self.enter(
            "variable.delete",
            &[kind_name(kind), service_id, variable_id],
            Operation::Delete,
            kind.resource(),
            variable_id,
        )?;
        let variables = state
            .variables
            .entry((kind, service_id.to_string()))
            .or_default();
        let before = variables.len();
        variables.retain(|v| v.id != variable_id);
        if variables.len() == before {
            return Err(not_found(Operation::Delete, kind.resource(), variable_id));
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentStageRepository for FakeCloud {
    async fn create(
        &self,
        _ctx: &Context,
        environment_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage> {
        let mut state = self.enter(
            "stage.create",
            &[environment_id],
            Operation::Create,
            ResourceKind::DeploymentStage,
            &request.name,
        )?;
        let id = state.next_id("stage");
        let order = state
            .stages
            .values()
            .filter(|s| s.environment_id == environment_id)
            .count() as u32;
        let stage = DeploymentStage {
            id: id.clone(),
            environment_id: environment_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            deployment_order: Some(order),
        };
        state.stages.insert(id, stage.clone());
        Ok(stage)
    }

    async fn get(&self, _ctx: &Context, stage_id: &str) -> Result<DeploymentStage> {
        let state = self.enter(
            "stage.get",
            &[stage_id],
            Operation::Read,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        state
            .stages
            .get(stage_id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, ResourceKind::DeploymentStage, stage_id))
    }

    async fn update(
        &self,
        _ctx: &Context,
        stage_id: &str,
        request: &DeploymentStageRequest,
    ) -> Result<DeploymentStage> {
        let mut state = self.enter(
            "stage.update",
            &[stage_id],
            Operation::Update,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        let stage = state
            .stages
            .get_mut(stage_id)
            .ok_or_else(|| not_found(Operation::Update, ResourceKind::DeploymentStage, stage_id))?;
        stage.name = request.name.clone();
        stage.description = request.description.clone();
        Ok(stage.clone())
    }

    async fn delete(&self, _ctx: &Context, stage_id: &str) -> Result<()> {
        let mut state = self.enter(
            "stage.delete",
            &[stage_id],
            Operation::Delete,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        state
            .stages
            .remove(stage_id)
            .map(|_| ())
            .ok_or_else(|| not_found(Operation::Delete, ResourceKind::DeploymentStage, stage_id))
    }

    async fn move_after(
        &self,
        _ctx: &Context,
        stage_id: &str,
        after_stage_id: &str,
    ) -> Result<DeploymentStage> {
        let mut state = self.enter(
            "stage.move_after",
            &[stage_id, after_stage_id],
            Operation::Update,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        move_relative(&mut state, stage_id, after_stage_id, 1)
    }

    async fn move_before(
        &self,
        _ctx: &Context,
        stage_id: &str,
        before_stage_id: &str,
    ) -> Result<DeploymentStage> {
        let mut state = self.enter(
            "stage.move_before",
            &[stage_id, before_stage_id],
            Operation::Update,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        move_relative(&mut state, stage_id, before_stage_id, 0)
    }

    async fn attach_service(
        &self,
        _ctx: &Context,
        stage_id: &str,
        service_id: &str,
    ) -> Result<()> {
        let mut state = self.enter(
            "stage.attach_service",
            &[stage_id, service_id],
            Operation::Update,
            ResourceKind::DeploymentStage,
            stage_id,
        )?;
        if !state.stages.contains_key(stage_id) {
            return Err(not_found(
                Operation::Update,
                ResourceKind::DeploymentStage,
                stage_id,
            ));
        }
        state
            .service_stages
            .insert(service_id.to_string(), stage_id.to_string());
        Ok(())
    }

    async fn get_service_stage(
        &self,
        _ctx: &Context,
        service_id: &str,
    ) -> Result<DeploymentStage> {
        let state = self.enter(
            "stage.get_service_stage",
            &[service_id],
            Operation::Read,
            ResourceKind::DeploymentStage,
            service_id,
        )?;
        state
            .service_stages
            .get(service_id)
            .and_then(|stage_id| state.stages.get(stage_id))
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, ResourceKind::DeploymentStage, service_id))
    }
}

/// Place `stage_id` at the rank of `anchor_id` plus `offset`
fn move_relative(
    state: &mut FakeState,
    stage_id: &str,
    anchor_id: &str,
    offset: u32,
) -> Result<DeploymentStage> {
    let anchor = state
        .stages
        .get(anchor_id)
        .and_then(|s| s.deployment_order)
        .ok_or_else(|| not_found(Operation::Update, ResourceKind::DeploymentStage, anchor_id))?;
    let stage = state
        .stages
        .get_mut(stage_id)
        .ok_or_else(|| not_found(Operation::Update, ResourceKind::DeploymentStage, stage_id))?;
    stage.deployment_order = Some(anchor + offset);
    Ok(stage.clone())
}

#[async_trait]
impl OrganizationRepository for FakeCloud {
    async fn get(&self, _ctx: &Context, organization_id: &str) -> Result<Organization> {
        let state = self.enter(
            "organization.get",
            &[organization_id],
            Operation::Read,
            ResourceKind::Organization,
            organization_id,
        )?;
        state
            .organizations
            .get(organization_id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Read, ResourceKind::Organization, organization_id))
    }

    async fn update(
        &self,
        _ctx: &Context,
        organization_id: &str,
        params: &OrganizationParams,
    ) -> Result<Organization> {
        let mut state = self.enter(
            "organization.update",
            &[organization_id],
            Operation::Update,
            ResourceKind::Organization,
            organization_id,
        )?;
        let organization = state.organizations.get_mut(organization_id).ok_or_else(|| {
            not_found(Operation::Update, ResourceKind::Organization, organization_id)
        })?;
        organization.name = params.name.clone();
        organization.plan = params.plan;
        organization.description = params.description.clone();
        Ok(organization.clone())
    }
}
