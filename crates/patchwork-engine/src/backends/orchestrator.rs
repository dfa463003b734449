/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Puppet orchestrator v1 client.

use super::tls::build_client;
use super::{
    DefinitionMetadata, JobHandle, OrchestratorJobKind, ParamSpec, PlanRequest, TaskRequest,
    TaskRunner,
};
use crate::error::ClientError;
use async_trait::async_trait;
use patchwork_models::models::Backend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Task and plan runner backed by the orchestrator API.
pub struct OrchestratorClient {
    client: reqwest::Client,
    base_url: Url,
    console_host: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskJobId {
    job: TaskJobRef,
}

#[derive(Debug, Deserialize)]
struct TaskJobRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlanJobId {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JobState {
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataEnvelope {
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    description: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, RawParameter>,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    #[serde(rename = "type")]
    param_type: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaskBody<'a> {
    environment: &'a str,
    task: &'a str,
    params: &'a Map<String, Value>,
    scope: Value,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct PlanBody<'a> {
    plan_name: &'a str,
    params: &'a Map<String, Value>,
    environment: &'a str,
    description: &'a str,
}

impl OrchestratorClient {
    pub fn new(backend: &Backend, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(&backend.api_base_url())
            .map_err(|e| ClientError::Config(format!("Invalid orchestrator URL: {}", e)))?;
        Ok(Self {
            client: build_client(backend, timeout)?,
            base_url,
            console_host: backend.hostname.clone(),
            token: backend.token.clone(),
        })
    }

    /// Console link for a task job.
    pub fn task_console_url(&self, name: &str) -> String {
        format!(
            "https://{}/#/orchestration/tasks/task/{}",
            self.console_host, name
        )
    }

    /// Console link for a plan job.
    pub fn plan_console_url(&self, name: &str) -> String {
        format!(
            "https://{}/#/orchestration/plans/plan/{}",
            self.console_host, name
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(&format!("/orchestrator/v1/{}", path))
            .map_err(|e| ClientError::Config(format!("Invalid endpoint: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("X-Authentication", token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_reqwest)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let request = self.client.get(self.endpoint(path)?).query(query);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        Self::read(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let request = self.client.post(self.endpoint(path)?).json(body);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        Self::read(response).await
    }

    async fn metadata(
        &self,
        collection: &str,
        environment: &str,
        module: &str,
        name: &str,
    ) -> Result<DefinitionMetadata, ClientError> {
        let envelope: MetadataEnvelope = self
            .get(
                &format!("{}/{}/{}", collection, module, name),
                &[("environment", environment)],
            )
            .await?;
        Ok(envelope.metadata.into())
    }
}

impl From<RawMetadata> for DefinitionMetadata {
    fn from(raw: RawMetadata) -> Self {
        DefinitionMetadata {
            description: raw.description,
            params: raw
                .parameters
                .into_iter()
                .map(|(name, param)| ParamSpec {
                    name,
                    param_type: param.param_type.unwrap_or_else(|| "String".to_string()),
                    description: param.description,
                    default_value: None,
                })
                .collect(),
        }
    }
}

/// Maps plan job states onto the task job vocabulary.
fn normalize_plan_state(state: String) -> String {
    match state.as_str() {
        "success" => "finished".to_string(),
        "failure" => "failed".to_string(),
        _ => state,
    }
}

#[async_trait]
impl TaskRunner for OrchestratorClient {
    async fn submit_task(&self, request: &TaskRequest) -> Result<JobHandle, ClientError> {
        let body = TaskBody {
            environment: &request.environment,
            task: &request.task,
            params: &request.params,
            scope: json!({ "nodes": request.nodes }),
            description: &request.description,
        };
        let accepted: TaskJobId = self.post("command/task", &body).await?;
        Ok(JobHandle {
            console_url: self.task_console_url(&accepted.job.name),
            id: accepted.job.name,
            url: Some(accepted.job.id),
        })
    }

    async fn submit_plan(&self, request: &PlanRequest) -> Result<JobHandle, ClientError> {
        let body = PlanBody {
            plan_name: &request.plan,
            params: &request.params,
            environment: &request.environment,
            description: &request.description,
        };
        let accepted: PlanJobId = self.post("command/plan_run", &body).await?;
        Ok(JobHandle {
            console_url: self.plan_console_url(&accepted.name),
            id: accepted.name,
            url: None,
        })
    }

    async fn job_state(
        &self,
        kind: OrchestratorJobKind,
        id: &str,
    ) -> Result<Option<String>, ClientError> {
        match kind {
            OrchestratorJobKind::Task => {
                let job: JobState = self.get(&format!("jobs/{}", id), &[]).await?;
                Ok(job.state)
            }
            OrchestratorJobKind::Plan => {
                let job: JobState = self.get(&format!("plan_jobs/{}", id), &[]).await?;
                Ok(job.state.map(normalize_plan_state))
            }
        }
    }

    async fn task_metadata(
        &self,
        environment: &str,
        module: &str,
        name: &str,
    ) -> Result<DefinitionMetadata, ClientError> {
        self.metadata("tasks", environment, module, name).await
    }

    async fn plan_metadata(
        &self,
        environment: &str,
        module: &str,
        name: &str,
    ) -> Result<DefinitionMetadata, ClientError> {
        self.metadata("plans", environment, module, name).await
    }
}
