/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Inventory Reconciler
//!
//! Rebuilds a patch run's Application → Environment → Component → Server
//! hierarchy from the inventory of every enabled orchestrator backend.
//!
//! A pass starts by deleting everything below the run, then walks the nodes
//! whose patch window fact matches the run's window. Failures of a single
//! backend or node are collected in the [`ReconcileReport`] and the pass
//! carries on with the rest.
//!
//! Passes over the same run must not overlap; callers serialize them.

use crate::backends::BackendRegistry;
use crate::error::EngineError;
use crate::inventory::{NodeQuery, NodeRecord, ServerFacts};
use crate::metrics;
use crate::store::Store;
use patchwork_models::models::applications::procedure_url;
use patchwork_models::models::{
    Backend, HealthCheckUpdate, NewApplication, NewComponent, NewEnvironment, NewPatchRun,
    PatchRun,
};
use patchwork_utils::logging::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// One failure collected during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileError {
    pub backend: String,
    /// Certname of the node being written, when the failure is per node.
    pub node: Option<String>,
    pub message: String,
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "[{}] {}: {}", self.backend, node, self.message),
            None => write!(f, "[{}] {}", self.backend, self.message),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub errors: Vec<ReconcileError>,
    pub backends_queried: usize,
    /// Disabled orchestrator backends.
    pub backends_skipped: usize,
    pub nodes_seen: usize,
    pub servers_written: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Reconciler {
    store: Arc<dyn Store>,
    registry: Arc<BackendRegistry>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, registry: Arc<BackendRegistry>) -> Self {
        Self { store, registry }
    }

    /// Replaces the run's hierarchy with what the inventory reports now.
    ///
    /// Only failing to clear the old hierarchy or to list backends aborts the
    /// pass. Everything else is collected in the report.
    pub async fn reconcile(&self, run: &PatchRun) -> Result<ReconcileReport, EngineError> {
        let started = Instant::now();
        let mut report = ReconcileReport::default();

        let removed = self.store.delete_applications_for_patch_run(run.id)?;
        debug!(
            "Cleared {} applications of patch run {} before reconciling",
            removed, run.id
        );

        for backend in self.store.list_backends()? {
            if !backend.is_orchestrator() {
                continue;
            }
            if !backend.enabled {
                report.backends_skipped += 1;
                continue;
            }
            report.backends_queried += 1;

            let nodes = match self.query_backend(&backend, &run.patch_window).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    error!(
                        "Inventory query failed for backend '{}' (window '{}'): {}",
                        backend.name, run.patch_window, e
                    );
                    report.errors.push(ReconcileError {
                        backend: backend.name.clone(),
                        node: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            info!(
                "Backend '{}' reported {} nodes for window '{}'",
                backend.name,
                nodes.len(),
                run.patch_window
            );
            report.nodes_seen += nodes.len();

            for node in &nodes {
                match self.write_node(run, &backend, node) {
                    Ok(()) => report.servers_written += 1,
                    Err(e) => {
                        error!(
                            "Failed to record node '{}' from backend '{}': {}",
                            node.certname, backend.name, e
                        );
                        report.errors.push(ReconcileError {
                            backend: backend.name.clone(),
                            node: Some(node.certname.clone()),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        metrics::SERVERS_RECONCILED_TOTAL.inc_by(report.servers_written as u64);
        metrics::RECONCILE_ERRORS_TOTAL.inc_by(report.errors.len() as u64);
        metrics::RECONCILE_DURATION_SECONDS
            .with_label_values(&[if report.is_clean() { "clean" } else { "partial" }])
            .observe(started.elapsed().as_secs_f64());

        info!(
            "Reconciled patch run {} ('{}'): {} servers from {} backends, {} errors",
            run.id,
            run.patch_window,
            report.servers_written,
            report.backends_queried,
            report.errors.len()
        );
        Ok(report)
    }

    /// Reconciles the newest run for `window`, creating one if none exists.
    pub async fn reconcile_window(
        &self,
        window: &str,
    ) -> Result<(PatchRun, ReconcileReport), EngineError> {
        let run = match self.store.latest_patch_run_for_window(window)? {
            Some(run) => run,
            None => {
                let new_run = NewPatchRun::new(None, None, window.to_string(), None, None)
                    .map_err(EngineError::Validation)?;
                let run = self.store.create_patch_run(&new_run)?;
                info!("Created patch run '{}' for window '{}'", run.name, window);
                run
            }
        };
        let report = self.reconcile(&run).await?;
        Ok((run, report))
    }

    /// Distinct patch windows across enabled orchestrators, with node counts.
    pub async fn patch_windows(
        &self,
    ) -> Result<(BTreeMap<String, u64>, Vec<ReconcileError>), EngineError> {
        let mut windows: BTreeMap<String, u64> = BTreeMap::new();
        let mut errors = Vec::new();

        for backend in self.store.list_backends()? {
            if !backend.is_orchestrator() || !backend.enabled {
                continue;
            }
            let values = match self.registry.connection_for(&backend) {
                Ok(connection) => match connection.inventory() {
                    Ok(inventory) => inventory
                        .fact_values(&backend.fact_name)
                        .await
                        .map_err(|e| EngineError::backend(&backend.name, e)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match values {
                Ok(values) => {
                    for value in values {
                        if value.value.trim().is_empty() {
                            continue;
                        }
                        *windows.entry(value.value).or_insert(0) += value.count;
                    }
                }
                Err(e) => {
                    warn!("Failed to list patch windows on '{}': {}", backend.name, e);
                    errors.push(ReconcileError {
                        backend: backend.name.clone(),
                        node: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok((windows, errors))
    }

    async fn query_backend(
        &self,
        backend: &Backend,
        window: &str,
    ) -> Result<Vec<NodeRecord>, EngineError> {
        let connection = self.registry.connection_for(backend)?;
        connection
            .inventory()?
            .query_nodes(&NodeQuery::patch_window(&backend.fact_name, window))
            .await
            .map_err(|e| EngineError::backend(&backend.name, e))
    }

    fn write_node(
        &self,
        run: &PatchRun,
        backend: &Backend,
        node: &NodeRecord,
    ) -> Result<(), EngineError> {
        let facts = ServerFacts::extract(node, backend);

        let new_app = NewApplication::new(
            run.id,
            facts.application.clone(),
            &facts.patching_procedure,
        )
        .map_err(EngineError::Validation)?;
        let mut app = self.store.get_or_create_application(&new_app)?;
        if let Some(url) = procedure_url(&facts.patching_procedure) {
            // the last node reporting a link wins
            if app.patching_procedure.as_deref() != Some(url.as_str()) {
                app.patching_procedure = Some(url);
                app = self.store.update_application(&app)?;
            }
        }

        let new_env = NewEnvironment::new(app.id, facts.environment.clone())
            .map_err(EngineError::Validation)?;
        let env = self.store.get_or_create_environment(&new_env)?;

        let new_component = NewComponent::new(env.id, facts.component.clone())
            .map_err(EngineError::Validation)?;
        let component = self.store.get_or_create_component(&new_component)?;

        match component.offer_health_check(&facts.health_check) {
            HealthCheckUpdate::Set(value) => {
                self.store.set_component_health_check(component.id, &value)?;
            }
            HealthCheckUpdate::Conflict { existing, rejected } => {
                warn!(
                    "Health check conflict on component '{}' ({}): keeping '{}', ignoring '{}' from {}",
                    component.name, app.name, existing, rejected, node.certname
                );
            }
            HealthCheckUpdate::Unchanged => {}
        }

        self.store
            .upsert_server(&facts.to_new_server(component.id, backend.id))?;
        Ok(())
    }
}
