/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Automation Backends
//!
//! Seams to the remote services that run work:
//!
//! - [`TaskRunner`] submits orchestrator tasks and plans and reports job state.
//! - [`BuildRunner`] queues parameterized builds and resolves queue items to
//!   build records.
//!
//! Concrete HTTP clients live in [`orchestrator`] and [`jenkins`]. The
//! [`registry`] hands out one shared connection per configured backend.

use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod jenkins;
pub mod orchestrator;
pub mod registry;
pub mod tls;

pub use jenkins::JenkinsClient;
pub use orchestrator::OrchestratorClient;
pub use registry::{BackendConnection, BackendRegistry, ConnectionFactory, HttpConnectionFactory};

/// A task run against an explicit node list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRequest {
    pub task: String,
    pub params: Map<String, Value>,
    pub environment: String,
    pub description: String,
    pub nodes: Vec<String>,
}

/// A plan run. Targets travel inside `params`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRequest {
    pub plan: String,
    pub params: Map<String, Value>,
    pub environment: String,
    pub description: String,
}

/// What the orchestrator returns for an accepted task or plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Backend job identifier.
    pub id: String,
    /// API location of the job, when the backend reports one.
    pub url: Option<String>,
    /// Link to the job in the backend console.
    pub console_url: String,
}

/// Kind of orchestrator job being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorJobKind {
    Task,
    Plan,
}

/// One declared parameter of an upstream task, plan or build job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: String,
    pub description: Option<String>,
    pub default_value: Option<String>,
}

/// Upstream description and parameters of a task, plan or build job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionMetadata {
    pub description: Option<String>,
    pub params: Vec<ParamSpec>,
}

/// A queued build. `executable` is set once the build has started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueItem {
    pub executable: Option<Executable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub number: i64,
    pub url: String,
}

/// A build as reported by the build server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub name: String,
    pub number: i64,
    pub url: String,
    /// Terminal result, absent while the build is running.
    pub result: Option<String>,
}

/// Orchestrator operations.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn submit_task(&self, request: &TaskRequest) -> Result<JobHandle, ClientError>;

    async fn submit_plan(&self, request: &PlanRequest) -> Result<JobHandle, ClientError>;

    /// Current state of a job, `None` when the backend reports none.
    async fn job_state(
        &self,
        kind: OrchestratorJobKind,
        id: &str,
    ) -> Result<Option<String>, ClientError>;

    async fn task_metadata(
        &self,
        environment: &str,
        module: &str,
        name: &str,
    ) -> Result<DefinitionMetadata, ClientError>;

    async fn plan_metadata(
        &self,
        environment: &str,
        module: &str,
        name: &str,
    ) -> Result<DefinitionMetadata, ClientError>;
}

/// Build server operations.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Queues a build and returns its queue item id.
    async fn submit_build(
        &self,
        job_path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<i64, ClientError>;

    async fn queue_item(&self, queue_id: i64) -> Result<QueueItem, ClientError>;

    async fn build(&self, job_path: &str, number: i64) -> Result<BuildRecord, ClientError>;

    async fn job_parameters(&self, job_path: &str) -> Result<DefinitionMetadata, ClientError>;
}
