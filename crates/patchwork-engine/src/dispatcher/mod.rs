/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Job Dispatcher
//!
//! Turns "run this definition against this target" into backend submissions
//! and persisted [`Job`] records.
//!
//! A dispatch happens in two phases. Planning loads the target and the
//! definition, validates the request and resolves parameters, touching only
//! the store. Submission then sends each planned request to its backend and
//! persists a job as soon as the backend accepts it. A request rejected by
//! planning never reaches the network.
//!
//! Component targets are split by the backend each member server was
//! inventoried from; every group becomes its own job.

use crate::backends::{BackendRegistry, PlanRequest, TaskRequest};
use crate::error::EngineError;
use crate::metrics;
use crate::store::Store;
use crate::tracker::{Tracker, TrackingPool};
use crate::utils::templating::ContextOverlays;
use patchwork_models::models::definitions::{KIND_BUILD, KIND_PLAN, KIND_TASK};
use patchwork_models::models::{
    components, Backend, Definition, DefinitionParam, Initiator, Job, JobParent, NewJob, PatchRun,
    ScopeLevel, Server,
};
use patchwork_utils::config::Engine as EngineSettings;
use patchwork_utils::logging::prelude::*;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod context;
pub mod definitions;
pub mod params;

pub use context::ComponentScope;
pub use definitions::{DefinitionSync, SyncSummary};

/// What a dispatch runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A component's servers, optionally only those from one backend.
    Component { id: Uuid, backend: Option<Uuid> },
    Server(Uuid),
    PatchRun(Uuid),
}

impl Target {
    pub fn level(&self) -> ScopeLevel {
        match self {
            Target::Component { .. } => ScopeLevel::Component,
            Target::Server(_) => ScopeLevel::Server,
            Target::PatchRun(_) => ScopeLevel::PatchRun,
        }
    }

    fn initiator(&self) -> Initiator {
        match *self {
            Target::Component { id, .. } => Initiator::Component(id),
            Target::Server(id) => Initiator::Server(id),
            Target::PatchRun(id) => Initiator::PatchRun(id),
        }
    }
}

/// What a dispatch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Task(Uuid),
    Plan(Uuid),
    Build {
        definition_id: Uuid,
        wait_for_completion: bool,
    },
    /// The configured one-click cluster patching plan.
    ClusterPatch,
    /// Patches servers with the backend's patching module, or only cleans
    /// the package cache in test mode.
    PatchServer { test_mode: bool },
}

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub operation: Operation,
    /// Parameter values that replace templates and defaults.
    pub overrides: BTreeMap<String, String>,
    /// Link embedded in the job description. Defaults to the run's page.
    pub origin_url: Option<String>,
}

impl DispatchRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            overrides: BTreeMap::new(),
            origin_url: None,
        }
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_origin_url(mut self, url: impl Into<String>) -> Self {
        self.origin_url = Some(url.into());
        self
    }
}

/// Dispatcher settings taken from the `engine` config section.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub base_url: String,
    pub cluster_patch_plan: String,
    /// Environment of the built-in cluster and server patching operations.
    pub default_environment: String,
}

impl From<&EngineSettings> for DispatchSettings {
    fn from(engine: &EngineSettings) -> Self {
        Self {
            base_url: engine.base_url.trim_end_matches('/').to_string(),
            cluster_patch_plan: engine.cluster_patch_plan.clone(),
            default_environment: engine.default_environment.clone(),
        }
    }
}

/// The loaded target with its member servers.
enum TargetScope {
    Component(ComponentScope, Vec<Server>),
    Server(ComponentScope, Server),
    PatchRun(PatchRun, Vec<Server>),
}

impl TargetScope {
    fn patch_run(&self) -> &PatchRun {
        match self {
            TargetScope::Component(scope, _) | TargetScope::Server(scope, _) => &scope.patch_run,
            TargetScope::PatchRun(run, _) => run,
        }
    }

    fn servers(&self) -> Vec<Server> {
        match self {
            TargetScope::Component(_, servers) | TargetScope::PatchRun(_, servers) => {
                servers.clone()
            }
            TargetScope::Server(_, server) => vec![server.clone()],
        }
    }

    /// Template context for the target, limited to `group` where servers matter.
    fn overlays(&self, group: &[Server]) -> Result<ContextOverlays, EngineError> {
        match self {
            TargetScope::Component(scope, _) => scope.component_context(group),
            TargetScope::Server(scope, server) => scope.server_context(server),
            TargetScope::PatchRun(run, _) => context::patch_run_context(run),
        }
    }
}

/// A validated backend submission.
enum Submission {
    Task {
        backend: Backend,
        request: TaskRequest,
        job: NewJob,
    },
    Plan {
        backend: Backend,
        request: PlanRequest,
        job: NewJob,
    },
    Build {
        backend: Backend,
        job_path: String,
        params: BTreeMap<String, String>,
        job: NewJob,
        wait_for_completion: bool,
    },
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    registry: Arc<BackendRegistry>,
    tracker: Arc<Tracker>,
    pool: TrackingPool,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<BackendRegistry>,
        tracker: Arc<Tracker>,
        pool: TrackingPool,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            registry,
            tracker,
            pool,
            settings,
        }
    }

    /// Runs `request` against `target`, returning the jobs created.
    ///
    /// Builds waiting for completion are returned after tracking. Detached
    /// builds are handed to the tracking pool; if its queue is full the job
    /// stays pending and the queue error is returned.
    pub async fn dispatch(
        &self,
        target: Target,
        request: &DispatchRequest,
    ) -> Result<Vec<Job>, EngineError> {
        let result = self.dispatch_inner(target, request).await;
        if let Err(e) = &result {
            metrics::DISPATCH_FAILURES_TOTAL
                .with_label_values(&[failure_reason(e)])
                .inc();
            warn!(
                "Dispatch of {:?} against {:?} failed: {}",
                request.operation, target, e
            );
        }
        result
    }

    async fn dispatch_inner(
        &self,
        target: Target,
        request: &DispatchRequest,
    ) -> Result<Vec<Job>, EngineError> {
        let submissions = self.plan(target, request)?;
        let mut jobs = Vec::with_capacity(submissions.len());
        let mut failures = Vec::new();
        for submission in submissions {
            match self.submit(submission).await {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    warn!("Backend group of {:?} failed: {}", target, e);
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            return Ok(jobs);
        }
        if jobs.is_empty() && failures.len() == 1 {
            return Err(failures.remove(0));
        }
        Err(EngineError::PartialDispatch {
            submitted: jobs,
            failures,
        })
    }

    // ===== PLANNING =====

    fn plan(&self, target: Target, request: &DispatchRequest) -> Result<Vec<Submission>, EngineError> {
        let scope = self.load_target(target)?;
        let run = scope.patch_run();
        let origin_url = request
            .origin_url
            .clone()
            .unwrap_or_else(|| format!("{}/patchRun/{}", self.settings.base_url, run.id));
        let description = format!("Started from: {}", origin_url);

        match request.operation {
            Operation::Task(definition_id) => {
                let (definition, declared) =
                    self.load_definition(definition_id, KIND_TASK, target, request)?;
                let groups = group_by_backend(&scope.servers(), Some(definition.backend_id))?;
                let mut submissions = Vec::new();
                for (backend_id, servers) in groups {
                    let backend = self.orchestrator(backend_id)?;
                    let overlays = scope.overlays(&servers)?;
                    submissions.push(Submission::Task {
                        request: TaskRequest {
                            task: definition.name.clone(),
                            params: params::resolve(&declared, &request.overrides, &overlays),
                            environment: definition.environment.clone(),
                            description: description.clone(),
                            nodes: node_names(&servers),
                        },
                        job: self.new_job(
                            &definition.name,
                            KIND_TASK,
                            target,
                            JobParent::Task(definition.id),
                            backend.id,
                            run.id,
                        )?,
                        backend,
                    });
                }
                Ok(submissions)
            }
            Operation::Plan(definition_id) => {
                let (definition, declared) =
                    self.load_definition(definition_id, KIND_PLAN, target, request)?;
                let groups = group_by_backend(&scope.servers(), Some(definition.backend_id))?;
                let mut submissions = Vec::new();
                for (backend_id, servers) in groups {
                    let backend = self.orchestrator(backend_id)?;
                    let overlays = scope.overlays(&servers)?;
                    submissions.push(Submission::Plan {
                        request: PlanRequest {
                            plan: definition.name.clone(),
                            params: params::resolve(&declared, &request.overrides, &overlays),
                            environment: definition.environment.clone(),
                            description: description.clone(),
                        },
                        job: self.new_job(
                            &definition.name,
                            KIND_PLAN,
                            target,
                            JobParent::Plan(definition.id),
                            backend.id,
                            run.id,
                        )?,
                        backend,
                    });
                }
                Ok(submissions)
            }
            Operation::Build {
                definition_id,
                wait_for_completion,
            } => {
                let (definition, declared) =
                    self.load_definition(definition_id, KIND_BUILD, target, request)?;
                let backend = self.enabled_backend(definition.backend_id)?;
                if !backend.is_build_server() {
                    return Err(EngineError::Validation(format!(
                        "Backend '{}' is not a build server",
                        backend.name
                    )));
                }
                let overlays = scope.overlays(&scope.servers())?;
                Ok(vec![Submission::Build {
                    job_path: definition.name.clone(),
                    params: params::resolve_for_build(&declared, &request.overrides, &overlays),
                    job: self.new_job(
                        &definition.name,
                        KIND_BUILD,
                        target,
                        JobParent::Build(definition.id),
                        backend.id,
                        run.id,
                    )?,
                    backend,
                    wait_for_completion,
                }])
            }
            Operation::ClusterPatch => {
                let TargetScope::Component(component_scope, _) = &scope else {
                    return Err(EngineError::Validation(
                        "Cluster patching runs against a component".to_string(),
                    ));
                };
                let component = &component_scope.component;
                let health_check = match component.health_check.as_deref() {
                    Some(check) if component.has_health_check() => check.to_string(),
                    _ => {
                        return Err(EngineError::Validation(format!(
                            "Component '{}' has no health check (got '{}')",
                            component.name,
                            component.health_check.as_deref().unwrap_or(components::UNSET)
                        )))
                    }
                };

                let plan = self.settings.cluster_patch_plan.clone();
                let mut submissions = Vec::new();
                for (backend_id, servers) in group_by_backend(&scope.servers(), None)? {
                    let backend = self.orchestrator(backend_id)?;
                    let mut params = Map::new();
                    params.insert("targets".to_string(), json!(node_names(&servers)));
                    params.insert(
                        "post_reboot_scriptpath".to_string(),
                        Value::String(health_check.clone()),
                    );
                    submissions.push(Submission::Plan {
                        request: PlanRequest {
                            plan: plan.clone(),
                            params,
                            environment: self.settings.default_environment.clone(),
                            description: description.clone(),
                        },
                        job: self.new_job(
                            &plan,
                            KIND_PLAN,
                            target,
                            JobParent::Builtin,
                            backend.id,
                            run.id,
                        )?,
                        backend,
                    });
                }
                Ok(submissions)
            }
            Operation::PatchServer { test_mode } => {
                if matches!(scope, TargetScope::PatchRun(..)) {
                    return Err(EngineError::Validation(
                        "Server patching runs against a component or a server".to_string(),
                    ));
                }
                let mut submissions = Vec::new();
                for (backend_id, servers) in group_by_backend(&scope.servers(), None)? {
                    let backend = self.orchestrator(backend_id)?;
                    let (task, params) = if test_mode {
                        (format!("{}::clean_cache", backend.patching_module()), Map::new())
                    } else {
                        let mut params = Map::new();
                        params.insert("reboot".to_string(), Value::String("smart".to_string()));
                        (format!("{}::patch_server", backend.patching_module()), params)
                    };
                    submissions.push(Submission::Task {
                        job: self.new_job(
                            &task,
                            KIND_TASK,
                            target,
                            JobParent::Builtin,
                            backend.id,
                            run.id,
                        )?,
                        request: TaskRequest {
                            task,
                            params,
                            environment: self.settings.default_environment.clone(),
                            description: description.clone(),
                            nodes: node_names(&servers),
                        },
                        backend,
                    });
                }
                Ok(submissions)
            }
        }
    }

    fn load_target(&self, target: Target) -> Result<TargetScope, EngineError> {
        match target {
            Target::Component { id, backend } => {
                let scope = ComponentScope::load(self.store.as_ref(), id)?;
                let servers: Vec<Server> = self
                    .store
                    .list_servers(id)?
                    .into_iter()
                    .filter(|s| backend.is_none() || s.backend_id == backend)
                    .collect();
                Ok(TargetScope::Component(scope, servers))
            }
            Target::Server(id) => {
                let server = self
                    .store
                    .get_server(id)?
                    .ok_or_else(|| EngineError::not_found("server", id))?;
                let scope = ComponentScope::load(self.store.as_ref(), server.component_id)?;
                Ok(TargetScope::Server(scope, server))
            }
            Target::PatchRun(id) => {
                let run = self
                    .store
                    .get_patch_run(id)?
                    .ok_or_else(|| EngineError::not_found("patch run", id))?;
                let mut servers = Vec::new();
                for app in self.store.list_applications(run.id)? {
                    for env in self.store.list_environments(app.id)? {
                        for component in self.store.list_components(env.id)? {
                            servers.extend(self.store.list_servers(component.id)?);
                        }
                    }
                }
                Ok(TargetScope::PatchRun(run, servers))
            }
        }
    }

    /// Loads a definition and its params, rejecting requests it cannot serve.
    fn load_definition(
        &self,
        definition_id: Uuid,
        kind: &str,
        target: Target,
        request: &DispatchRequest,
    ) -> Result<(Definition, Vec<DefinitionParam>), EngineError> {
        let definition = self
            .store
            .get_definition(definition_id)?
            .ok_or_else(|| EngineError::not_found("definition", definition_id))?;

        if definition.kind != kind {
            return Err(EngineError::Validation(format!(
                "Definition '{}' is a {}, not a {}",
                definition.name, definition.kind, kind
            )));
        }
        if !definition.enabled {
            return Err(EngineError::Validation(format!(
                "Definition '{}' is disabled",
                definition.name
            )));
        }
        if !definition.allows(target.level()) {
            return Err(EngineError::Validation(format!(
                "Definition '{}' cannot run against a {}",
                definition.name,
                target.level()
            )));
        }

        let params = self.store.list_definition_params(definition.id)?;
        let unknown = params::undeclared_overrides(&params, &request.overrides);
        if !unknown.is_empty() {
            return Err(EngineError::Validation(format!(
                "Definition '{}' does not declare parameters: {}",
                definition.name,
                unknown.join(", ")
            )));
        }

        Ok((definition, params))
    }

    fn enabled_backend(&self, backend_id: Uuid) -> Result<Backend, EngineError> {
        let backend = self
            .store
            .get_backend(backend_id)?
            .ok_or_else(|| EngineError::not_found("backend", backend_id))?;
        if !backend.enabled {
            return Err(EngineError::Validation(format!(
                "Backend '{}' is disabled",
                backend.name
            )));
        }
        Ok(backend)
    }

    fn orchestrator(&self, backend_id: Uuid) -> Result<Backend, EngineError> {
        let backend = self.enabled_backend(backend_id)?;
        if !backend.is_orchestrator() {
            return Err(EngineError::Validation(format!(
                "Backend '{}' is not an orchestrator",
                backend.name
            )));
        }
        Ok(backend)
    }

    fn new_job(
        &self,
        name: &str,
        kind: &str,
        target: Target,
        parent: JobParent,
        backend_id: Uuid,
        patch_run_id: Uuid,
    ) -> Result<NewJob, EngineError> {
        NewJob::new(
            name.to_string(),
            kind,
            target.initiator(),
            parent,
            backend_id,
            Some(patch_run_id),
        )
        .map_err(EngineError::Validation)
    }

    // ===== SUBMISSION =====

    async fn submit(&self, submission: Submission) -> Result<Job, EngineError> {
        match submission {
            Submission::Task {
                backend,
                request,
                mut job,
            } => {
                let handle = self
                    .registry
                    .connection_for(&backend)?
                    .tasks()?
                    .submit_task(&request)
                    .await
                    .map_err(|e| EngineError::backend(&backend.name, e))?;
                job.api_job_id = Some(handle.id);
                job.api_job_url = handle.url;
                job.console_url = Some(handle.console_url);
                self.persist(job, &backend)
            }
            Submission::Plan {
                backend,
                request,
                mut job,
            } => {
                let handle = self
                    .registry
                    .connection_for(&backend)?
                    .tasks()?
                    .submit_plan(&request)
                    .await
                    .map_err(|e| EngineError::backend(&backend.name, e))?;
                job.api_job_id = Some(handle.id);
                job.api_job_url = handle.url;
                job.console_url = Some(handle.console_url);
                self.persist(job, &backend)
            }
            Submission::Build {
                backend,
                job_path,
                params,
                mut job,
                wait_for_completion,
            } => {
                let queue_id = self
                    .registry
                    .connection_for(&backend)?
                    .builds()?
                    .submit_build(&job_path, &params)
                    .await
                    .map_err(|e| EngineError::backend(&backend.name, e))?;
                job.queue_id = Some(queue_id);
                let job = self.persist(job, &backend)?;

                if wait_for_completion {
                    self.tracker.track(job.id).await
                } else {
                    self.pool.submit(job.id)?;
                    Ok(job)
                }
            }
        }
    }

    fn persist(&self, job: NewJob, backend: &Backend) -> Result<Job, EngineError> {
        let job = self.store.create_job(&job)?;
        metrics::JOBS_DISPATCHED_TOTAL
            .with_label_values(&[job.kind.as_str()])
            .inc();
        info!(
            "Dispatched {} '{}' to backend '{}' as job {}",
            job.kind, job.name, backend.name, job.id
        );
        Ok(job)
    }
}

fn node_names(servers: &[Server]) -> Vec<String> {
    servers.iter().map(|s| s.name.clone()).collect()
}

/// Groups servers by the backend they were inventoried from.
///
/// Servers with no recorded backend go to `fallback`. The target must have at
/// least one server.
fn group_by_backend(
    servers: &[Server],
    fallback: Option<Uuid>,
) -> Result<BTreeMap<Uuid, Vec<Server>>, EngineError> {
    if servers.is_empty() {
        return Err(EngineError::Validation("Target has no servers".to_string()));
    }
    let mut groups: BTreeMap<Uuid, Vec<Server>> = BTreeMap::new();
    for server in servers {
        let backend_id = server.backend_id.or(fallback).ok_or_else(|| {
            EngineError::Validation(format!("Server '{}' has no backend", server.name))
        })?;
        groups.entry(backend_id).or_default().push(server.clone());
    }
    Ok(groups)
}

fn failure_reason(error: &EngineError) -> &'static str {
    match error {
        EngineError::NotFound { .. } => "not_found",
        EngineError::Validation(_) => "validation",
        EngineError::Backend { .. } => "backend",
        EngineError::Store(_) => "store",
        EngineError::Template(_) => "template",
        EngineError::Queue(_) => "queue",
        EngineError::PartialDispatch { .. } => "partial",
    }
}
