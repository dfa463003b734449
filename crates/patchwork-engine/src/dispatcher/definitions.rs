/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Import and refresh of task, plan and build definitions from their backends.

use crate::backends::{BackendRegistry, DefinitionMetadata};
use crate::error::EngineError;
use crate::store::Store;
use patchwork_models::models::definitions::{KIND_BUILD, KIND_PLAN, KIND_TASK};
use patchwork_models::models::{Backend, Definition, NewDefinition, NewDefinitionParam};
use patchwork_utils::logging::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Counts of parameter changes made by one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub upserted: usize,
    pub deleted: usize,
    pub stale: usize,
}

pub struct DefinitionSync {
    store: Arc<dyn Store>,
    registry: Arc<BackendRegistry>,
}

impl DefinitionSync {
    pub fn new(store: Arc<dyn Store>, registry: Arc<BackendRegistry>) -> Self {
        Self { store, registry }
    }

    /// Creates a definition with the defaults for `kind` and syncs its parameters.
    pub async fn import(
        &self,
        backend_id: Uuid,
        kind: &str,
        name: &str,
    ) -> Result<(Definition, SyncSummary), EngineError> {
        let backend = self
            .store
            .get_backend(backend_id)?
            .ok_or_else(|| EngineError::not_found("backend", backend_id))?;
        check_backend_kind(&backend, kind)?;

        let new_definition =
            NewDefinition::new(backend_id, kind, name).map_err(EngineError::Validation)?;
        let definition = self.store.create_definition(&new_definition)?;
        info!(
            "Imported {} definition '{}' from backend '{}'",
            definition.kind, definition.name, backend.name
        );

        self.sync(definition.id).await
    }

    /// Refreshes a definition's parameters from its backend.
    ///
    /// Parameters gone upstream are deleted, unless they carry a template, in
    /// which case they are kept and flagged stale.
    pub async fn sync(&self, definition_id: Uuid) -> Result<(Definition, SyncSummary), EngineError> {
        let mut definition = self
            .store
            .get_definition(definition_id)?
            .ok_or_else(|| EngineError::not_found("definition", definition_id))?;
        let backend = self
            .store
            .get_backend(definition.backend_id)?
            .ok_or_else(|| EngineError::not_found("backend", definition.backend_id))?;
        check_backend_kind(&backend, &definition.kind)?;

        let metadata = self.fetch_metadata(&backend, &definition).await?;
        let mut summary = SyncSummary::default();

        let upstream: BTreeSet<&str> = metadata.params.iter().map(|p| p.name.as_str()).collect();
        for mut existing in self.store.list_definition_params(definition.id)? {
            if upstream.contains(existing.name.as_str()) {
                continue;
            }
            if existing.has_template() {
                if !existing.is_stale {
                    existing.is_stale = true;
                    self.store.update_definition_param(&existing)?;
                }
                summary.stale += 1;
            } else {
                self.store.delete_definition_param(existing.id)?;
                summary.deleted += 1;
            }
        }

        for spec in &metadata.params {
            let mut param =
                NewDefinitionParam::new(definition.id, spec.name.clone(), spec.param_type.clone())
                    .map_err(EngineError::Validation)?;
            param.description = spec.description.clone();
            param.default_value = spec.default_value.clone();
            self.store.upsert_definition_param(&param)?;
            summary.upserted += 1;
        }

        if metadata.description.is_some() && metadata.description != definition.description {
            definition.description = metadata.description.clone();
            definition = self.store.update_definition(&definition)?;
        }

        info!(
            "Synced definition '{}': {} current, {} deleted, {} stale",
            definition.name, summary.upserted, summary.deleted, summary.stale
        );
        Ok((definition, summary))
    }

    async fn fetch_metadata(
        &self,
        backend: &Backend,
        definition: &Definition,
    ) -> Result<DefinitionMetadata, EngineError> {
        let connection = self.registry.connection_for(backend)?;
        let fetched = match definition.kind.as_str() {
            KIND_TASK => {
                let (module, name) = definition.module_and_name();
                connection
                    .tasks()?
                    .task_metadata(&definition.environment, module, name)
                    .await
            }
            KIND_PLAN => {
                let (module, name) = definition.module_and_name();
                connection
                    .tasks()?
                    .plan_metadata(&definition.environment, module, name)
                    .await
            }
            KIND_BUILD => connection.builds()?.job_parameters(&definition.name).await,
            other => {
                return Err(EngineError::Validation(format!(
                    "Unknown definition kind '{}'",
                    other
                )))
            }
        };
        fetched.map_err(|e| EngineError::backend(&backend.name, e))
    }
}

fn check_backend_kind(backend: &Backend, kind: &str) -> Result<(), EngineError> {
    let compatible = match kind {
        KIND_TASK | KIND_PLAN => backend.is_orchestrator(),
        KIND_BUILD => backend.is_build_server(),
        _ => false,
    };
    if compatible {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "Backend '{}' ({}) cannot run {} definitions",
            backend.name, backend.kind, kind
        )))
    }
}
