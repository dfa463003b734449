/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Template contexts for dispatch targets.
//!
//! Ancestors are added as named layers (`patch_run`, `application`,
//! `environment`, `component`); the target's own fields are flattened on top.

use crate::error::EngineError;
use crate::store::Store;
use crate::utils::templating::ContextOverlays;
use patchwork_models::models::{Application, Component, Environment, PatchRun, Server};
use uuid::Uuid;

/// A component with every ancestor up to its patch run.
#[derive(Debug, Clone)]
pub struct ComponentScope {
    pub patch_run: PatchRun,
    pub application: Application,
    pub environment: Environment,
    pub component: Component,
}

impl ComponentScope {
    pub fn load(store: &dyn Store, component_id: Uuid) -> Result<Self, EngineError> {
        let component = store
            .get_component(component_id)?
            .ok_or_else(|| EngineError::not_found("component", component_id))?;
        let environment = store
            .get_environment(component.environment_id)?
            .ok_or_else(|| EngineError::not_found("environment", component.environment_id))?;
        let application = store
            .get_application(environment.application_id)?
            .ok_or_else(|| EngineError::not_found("application", environment.application_id))?;
        let patch_run = store
            .get_patch_run(application.patch_run_id)?
            .ok_or_else(|| EngineError::not_found("patch run", application.patch_run_id))?;

        Ok(Self {
            patch_run,
            application,
            environment,
            component,
        })
    }

    fn ancestry(&self) -> Result<ContextOverlays, EngineError> {
        let mut overlays = ContextOverlays::new();
        overlays.push_named("patch_run", &self.patch_run)?;
        overlays.push_named("application", &self.application)?;
        overlays.push_named("environment", &self.environment)?;
        Ok(overlays)
    }

    /// Context for a component target. Member servers are under `servers`.
    pub fn component_context(&self, servers: &[Server]) -> Result<ContextOverlays, EngineError> {
        let mut overlays = self.ancestry()?;
        overlays.push_named("component", &self.component)?;
        overlays.push_flat(&self.component)?;
        overlays.push_named("servers", &servers)?;
        Ok(overlays)
    }

    /// Context for one of the component's servers.
    pub fn server_context(&self, server: &Server) -> Result<ContextOverlays, EngineError> {
        let mut overlays = self.ancestry()?;
        overlays.push_named("component", &self.component)?;
        overlays.push_flat(server)?;
        Ok(overlays)
    }
}

pub fn patch_run_context(run: &PatchRun) -> Result<ContextOverlays, EngineError> {
    let mut overlays = ContextOverlays::new();
    overlays.push_named("patch_run", run)?;
    overlays.push_flat(run)?;
    Ok(overlays)
}
