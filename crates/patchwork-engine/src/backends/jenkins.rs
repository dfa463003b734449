/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Jenkins JSON API client.
//!
//! Job paths are slash separated folder paths (`team/patching/notify`) and map
//! onto nested `/job/<segment>` URLs.

use super::tls::build_client;
use super::{BuildRecord, BuildRunner, DefinitionMetadata, Executable, ParamSpec, QueueItem};
use crate::error::ClientError;
use async_trait::async_trait;
use patchwork_models::models::Backend;
use patchwork_utils::logging::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const BOOLEAN_PARAMETER: &str = "BooleanParameterDefinition";
const TEXT_PARAMETERS: &[&str] = &[
    "StringParameterDefinition",
    "ChoiceParameterDefinition",
    "TextParameterDefinition",
];

/// Build runner backed by a Jenkins server.
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: Url,
    username: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawQueueItem {
    executable: Option<RawExecutable>,
}

#[derive(Debug, Deserialize)]
struct RawExecutable {
    number: i64,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuild {
    full_display_name: Option<String>,
    number: i64,
    url: String,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    description: Option<String>,
    #[serde(default)]
    property: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProperty {
    #[serde(default)]
    parameter_definitions: Vec<RawParameterDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameterDefinition {
    name: String,
    #[serde(rename = "type")]
    param_type: String,
    description: Option<String>,
    default_parameter_value: Option<RawDefaultValue>,
}

#[derive(Debug, Deserialize)]
struct RawDefaultValue {
    value: Value,
}

/// `a/b/c` becomes `/job/a/job/b/job/c`. Surrounding slashes are ignored.
pub fn job_url_path(job_path: &str) -> String {
    job_path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/job/{}", segment))
        .collect()
}

/// Parses the queue item id from a `Location: .../queue/item/<id>/` header.
pub fn queue_id_from_location(location: &str) -> Option<i64> {
    let trimmed = location.trim_end_matches('/');
    let (prefix, id) = trimmed.rsplit_once('/')?;
    if !prefix.ends_with("/queue/item") {
        return None;
    }
    id.parse().ok()
}

/// Renders a parameter's default value according to its definition type.
///
/// Booleans become `true`/`false`, string-like types pass through. Any
/// other type is rejected.
pub fn typed_default(param_type: &str, value: &Value) -> Result<Option<String>, String> {
    if param_type == BOOLEAN_PARAMETER {
        return match value {
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Null => Ok(None),
            other => Err(format!("Expected a boolean default, got {}", other)),
        };
    }
    if TEXT_PARAMETERS.contains(&param_type) {
        return match value {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Null => Ok(None),
            other => Ok(Some(other.to_string())),
        };
    }
    Err(format!("Unable to handle parameter type: {}", param_type))
}

impl JenkinsClient {
    pub fn new(backend: &Backend, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(&backend.api_base_url())
            .map_err(|e| ClientError::Config(format!("Invalid build server URL: {}", e)))?;
        Ok(Self {
            client: build_client(backend, timeout)?,
            base_url,
            username: backend.username.clone(),
            token: backend.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("Invalid endpoint: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.token.as_ref()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.client.get(self.endpoint(path)?);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_reqwest)
    }
}

#[async_trait]
impl BuildRunner for JenkinsClient {
    async fn submit_build(
        &self,
        job_path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<i64, ClientError> {
        let action = if params.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let url = self.endpoint(&format!("{}/{}", job_url_path(job_path), action))?;
        let request = self.client.post(url).form(params);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ClientError::Decode("Build accepted without a queue location".into()))?;
        queue_id_from_location(location)
            .ok_or_else(|| ClientError::Decode("Queue location has no item id".to_string()))
    }

    async fn queue_item(&self, queue_id: i64) -> Result<QueueItem, ClientError> {
        let raw: RawQueueItem = self
            .get_json(&format!("/queue/item/{}/api/json", queue_id))
            .await?;
        Ok(QueueItem {
            executable: raw.executable.map(|e| Executable {
                number: e.number,
                url: e.url,
            }),
        })
    }

    async fn build(&self, job_path: &str, number: i64) -> Result<BuildRecord, ClientError> {
        let raw: RawBuild = self
            .get_json(&format!("{}/{}/api/json", job_url_path(job_path), number))
            .await?;
        Ok(BuildRecord {
            name: raw
                .full_display_name
                .unwrap_or_else(|| job_path.trim_matches('/').to_string()),
            number: raw.number,
            url: raw.url,
            result: raw.result,
        })
    }

    async fn job_parameters(&self, job_path: &str) -> Result<DefinitionMetadata, ClientError> {
        let raw: RawJob = self
            .get_json(&format!("{}/api/json", job_url_path(job_path)))
            .await?;

        let params = raw
            .property
            .into_iter()
            .flat_map(|property| property.parameter_definitions)
            .map(|definition| {
                let default_value = match &definition.default_parameter_value {
                    Some(default) => typed_default(&definition.param_type, &default.value)
                        .unwrap_or_else(|e| {
                            error!(
                                "Cannot read default of parameter '{}' on job '{}': {}",
                                definition.name, job_path, e
                            );
                            None
                        }),
                    None => None,
                };
                ParamSpec {
                    name: definition.name,
                    param_type: definition.param_type,
                    description: definition.description.filter(|d| !d.is_empty()),
                    default_value,
                }
            })
            .collect();

        Ok(DefinitionMetadata {
            description: raw.description.filter(|d| !d.is_empty()),
            params,
        })
    }
}
