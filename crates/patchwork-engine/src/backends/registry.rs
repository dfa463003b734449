/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Shared client connections, one per configured backend.
//!
//! Connections are created on first use through a [`ConnectionFactory`] and
//! cached by backend id. Editing a backend must be followed by
//! [`BackendRegistry::invalidate`] so the next caller picks up the new
//! settings.

use super::{BuildRunner, JenkinsClient, OrchestratorClient, TaskRunner};
use crate::error::{ClientError, EngineError};
use crate::inventory::{InventorySource, PuppetDbClient};
use crate::store::Store;
use moka::sync::Cache;
use patchwork_models::models::Backend;
use patchwork_utils::logging::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_CONNECTIONS: u64 = 256;

/// The clients available for one backend.
pub struct BackendConnection {
    pub backend: Backend,
    pub inventory: Option<Arc<dyn InventorySource>>,
    pub tasks: Option<Arc<dyn TaskRunner>>,
    pub builds: Option<Arc<dyn BuildRunner>>,
}

impl BackendConnection {
    pub fn inventory(&self) -> Result<Arc<dyn InventorySource>, EngineError> {
        self.inventory.clone().ok_or_else(|| {
            EngineError::Validation(format!("Backend '{}' has no inventory", self.backend.name))
        })
    }

    pub fn tasks(&self) -> Result<Arc<dyn TaskRunner>, EngineError> {
        self.tasks.clone().ok_or_else(|| {
            EngineError::Validation(format!(
                "Backend '{}' cannot run tasks or plans",
                self.backend.name
            ))
        })
    }

    pub fn builds(&self) -> Result<Arc<dyn BuildRunner>, EngineError> {
        self.builds.clone().ok_or_else(|| {
            EngineError::Validation(format!("Backend '{}' cannot run builds", self.backend.name))
        })
    }
}

/// Creates the clients for a backend.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self, backend: &Backend) -> Result<BackendConnection, ClientError>;
}

/// Builds the HTTP clients for orchestrator and build server backends.
pub struct HttpConnectionFactory {
    pub inventory_timeout: Duration,
    pub backend_timeout: Duration,
}

impl ConnectionFactory for HttpConnectionFactory {
    fn connect(&self, backend: &Backend) -> Result<BackendConnection, ClientError> {
        if backend.is_orchestrator() {
            let inventory = PuppetDbClient::new(backend, self.inventory_timeout)?;
            let tasks = OrchestratorClient::new(backend, self.backend_timeout)?;
            Ok(BackendConnection {
                backend: backend.clone(),
                inventory: Some(Arc::new(inventory)),
                tasks: Some(Arc::new(tasks)),
                builds: None,
            })
        } else if backend.is_build_server() {
            let builds = JenkinsClient::new(backend, self.backend_timeout)?;
            Ok(BackendConnection {
                backend: backend.clone(),
                inventory: None,
                tasks: None,
                builds: Some(Arc::new(builds)),
            })
        } else {
            Err(ClientError::Config(format!(
                "Unknown backend kind '{}'",
                backend.kind
            )))
        }
    }
}

/// Process-wide cache of backend connections.
pub struct BackendRegistry {
    store: Arc<dyn Store>,
    factory: Arc<dyn ConnectionFactory>,
    cache: Cache<Uuid, Arc<BackendConnection>>,
}

impl BackendRegistry {
    pub fn new(store: Arc<dyn Store>, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            store,
            factory,
            cache: Cache::new(MAX_CONNECTIONS),
        }
    }

    /// Connection for a backend id, loading the backend from the store on a miss.
    pub fn connection(&self, backend_id: Uuid) -> Result<Arc<BackendConnection>, EngineError> {
        if let Some(connection) = self.cache.get(&backend_id) {
            return Ok(connection);
        }
        let backend = self
            .store
            .get_backend(backend_id)?
            .ok_or_else(|| EngineError::not_found("backend", backend_id))?;
        self.connect(backend)
    }

    /// Connection for an already loaded backend.
    pub fn connection_for(&self, backend: &Backend) -> Result<Arc<BackendConnection>, EngineError> {
        if let Some(connection) = self.cache.get(&backend.id) {
            return Ok(connection);
        }
        self.connect(backend.clone())
    }

    fn connect(&self, backend: Backend) -> Result<Arc<BackendConnection>, EngineError> {
        let connection = self
            .factory
            .connect(&backend)
            .map_err(|e| EngineError::backend(&backend.name, e))?;
        debug!("Opened connection to backend '{}'", backend.name);
        let connection = Arc::new(connection);
        self.cache.insert(backend.id, connection.clone());
        Ok(connection)
    }

    /// Drops the cached connection of one backend.
    pub fn invalidate(&self, backend_id: Uuid) {
        self.cache.invalidate(&backend_id);
    }

    /// Drops every cached connection.
    pub fn shutdown(&self) {
        self.cache.invalidate_all();
        info!("Backend connections closed");
    }
}
