/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Error types shared across the engine.
//!
//! [`EngineError`] is what callers of the reconciler, dispatcher, tracker and
//! views see. [`ClientError`] is returned by the remote service clients and is
//! wrapped into [`EngineError::Backend`] together with the backend's name.

use crate::store::StoreError;
use crate::utils::templating::TemplateError;
use patchwork_models::models::Job;
use std::fmt;

/// Errors surfaced by engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// A requested entity does not exist.
    NotFound { entity: &'static str, id: String },
    /// The request was rejected before any network call was made.
    Validation(String),
    /// A remote service was unreachable or returned an error.
    Backend { backend: String, message: String },
    Store(StoreError),
    Template(TemplateError),
    /// The tracking queue refused a job.
    Queue(String),
    /// Some backend groups of a dispatch were submitted and others failed.
    /// `submitted` holds the persisted jobs, which are running upstream.
    PartialDispatch {
        submitted: Vec<Job>,
        failures: Vec<EngineError>,
    },
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn backend(backend: impl Into<String>, error: impl fmt::Display) -> Self {
        EngineError::Backend {
            backend: backend.into(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotFound { entity, id } => write!(f, "{} not found: {}", entity, id),
            EngineError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            EngineError::Backend { backend, message } => {
                write!(f, "Backend '{}' error: {}", backend, message)
            }
            EngineError::Store(e) => write!(f, "Store error: {}", e),
            EngineError::Template(e) => write!(f, "Template error: {}", e),
            EngineError::Queue(msg) => write!(f, "Tracking queue error: {}", msg),
            EngineError::PartialDispatch {
                submitted,
                failures,
            } => {
                write!(
                    f,
                    "Dispatch partially failed: {} job(s) submitted, {} failed",
                    submitted.len(),
                    failures.len()
                )?;
                for failure in failures {
                    write!(f, "; {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<TemplateError> for EngineError {
    fn from(e: TemplateError) -> Self {
        EngineError::Template(e)
    }
}

/// Errors returned by the inventory, automation and webhook clients.
///
/// Messages never carry request URLs, which may embed credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The client could not be constructed (bad CA bundle, bad base URL).
    Config(String),
    /// Transport failure: connect, TLS, timeout.
    Transport(String),
    /// The service answered with a non-success status.
    Status { status: u16, body: String },
    /// The response body did not have the expected shape.
    Decode(String),
}

impl ClientError {
    /// Builds a transport error from a reqwest error with the URL stripped.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let error = error.without_url();
        if error.is_timeout() {
            ClientError::Transport("Request timed out".to_string())
        } else if error.is_connect() {
            ClientError::Transport(format!("Connection failed: {}", error))
        } else if error.is_decode() {
            ClientError::Decode(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }

    /// Reads a failed response into a status error, keeping a short body preview.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        ClientError::Status {
            status,
            body: body.chars().take(500).collect(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "Client configuration error: {}", msg),
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ClientError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            ClientError::Decode(msg) => write!(f, "Unexpected response: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}
