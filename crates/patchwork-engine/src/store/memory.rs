/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! In-memory [`Store`] backed by a single `RwLock`.
//!
//! Rows are kept in insertion order, so "latest" means "inserted last" even
//! when two rows share a timestamp.

use super::{Store, StoreError};
use chrono::Utc;
use patchwork_models::models::{
    Application, Backend, Component, Definition, DefinitionParam, Environment, Initiator, Job,
    NewApplication, NewBackend, NewComponent, NewDefinition, NewDefinitionParam, NewEnvironment,
    NewJob, NewNotificationChannel, NewPatchRun, NewServer, NewTrelloBoard, NotificationChannel,
    PatchRun, PatchRunChannel, Server, TrelloBoard,
};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    patch_runs: Vec<PatchRun>,
    applications: Vec<Application>,
    environments: Vec<Environment>,
    components: Vec<Component>,
    servers: Vec<Server>,
    backends: Vec<Backend>,
    definitions: Vec<Definition>,
    definition_params: Vec<DefinitionParam>,
    jobs: Vec<Job>,
    channels: Vec<NotificationChannel>,
    patch_run_channels: Vec<PatchRunChannel>,
    boards: Vec<TrelloBoard>,
}

impl State {
    /// Removes applications matching `pred` and everything they own.
    fn cascade_applications<F: Fn(&Application) -> bool>(&mut self, pred: F) -> usize {
        let app_ids: Vec<Uuid> = self
            .applications
            .iter()
            .filter(|a| pred(a))
            .map(|a| a.id)
            .collect();
        let env_ids: Vec<Uuid> = self
            .environments
            .iter()
            .filter(|e| app_ids.contains(&e.application_id))
            .map(|e| e.id)
            .collect();
        let component_ids: Vec<Uuid> = self
            .components
            .iter()
            .filter(|c| env_ids.contains(&c.environment_id))
            .map(|c| c.id)
            .collect();

        self.servers
            .retain(|s| !component_ids.contains(&s.component_id));
        self.components.retain(|c| !component_ids.contains(&c.id));
        self.environments.retain(|e| !env_ids.contains(&e.id));
        self.applications.retain(|a| !app_ids.contains(&a.id));
        app_ids.len()
    }
}

/// A [`Store`] that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

fn sorted_by_name<T: Clone, F: Fn(&T) -> &str>(items: Vec<&T>, name: F) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().cloned().collect();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

fn replace<T: Clone, F: Fn(&T) -> bool>(
    rows: &mut [T],
    matches: F,
    entity: &str,
    updated: T,
) -> Result<T, StoreError> {
    match rows.iter_mut().find(|r| matches(r)) {
        Some(row) => {
            *row = updated.clone();
            Ok(updated)
        }
        None => Err(StoreError::NotFound(entity.to_string())),
    }
}

impl Store for MemoryStore {
    // ===== PATCH RUN OPERATIONS =====

    fn create_patch_run(&self, new_run: &NewPatchRun) -> Result<PatchRun, StoreError> {
        let now = Utc::now();
        let run = PatchRun {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: new_run.name.clone(),
            description: new_run.description.clone(),
            patch_window: new_run.patch_window.clone(),
            start_time: new_run.start_time,
            end_time: new_run.end_time,
        };
        self.write()?.patch_runs.push(run.clone());
        Ok(run)
    }

    fn get_patch_run(&self, id: Uuid) -> Result<Option<PatchRun>, StoreError> {
        Ok(self.read()?.patch_runs.iter().find(|r| r.id == id).cloned())
    }

    fn update_patch_run(&self, run: &PatchRun) -> Result<PatchRun, StoreError> {
        let mut updated = run.clone();
        updated.updated_at = Utc::now();
        let id = run.id;
        replace(&mut self.write()?.patch_runs, |r| r.id == id, "patch run", updated)
    }

    fn delete_patch_run(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let before = state.patch_runs.len();
        state.patch_runs.retain(|r| r.id != id);
        if state.patch_runs.len() == before {
            return Err(StoreError::NotFound("patch run".to_string()));
        }
        state.cascade_applications(|a| a.patch_run_id == id);
        state.patch_run_channels.retain(|l| l.patch_run_id != id);
        state.boards.retain(|b| b.patch_run_id != id);
        for job in state.jobs.iter_mut().filter(|j| j.patch_run_id == Some(id)) {
            job.patch_run_id = None;
        }
        Ok(())
    }

    fn list_patch_runs(&self) -> Result<Vec<PatchRun>, StoreError> {
        Ok(self.read()?.patch_runs.iter().rev().cloned().collect())
    }

    fn latest_patch_run(&self) -> Result<Option<PatchRun>, StoreError> {
        Ok(self.read()?.patch_runs.last().cloned())
    }

    fn latest_patch_run_for_window(&self, window: &str) -> Result<Option<PatchRun>, StoreError> {
        Ok(self
            .read()?
            .patch_runs
            .iter()
            .rev()
            .find(|r| r.patch_window == window)
            .cloned())
    }

    // ===== HIERARCHY OPERATIONS =====

    fn get_or_create_application(&self, new_app: &NewApplication) -> Result<Application, StoreError> {
        let mut state = self.write()?;
        if !state.patch_runs.iter().any(|r| r.id == new_app.patch_run_id) {
            return Err(StoreError::NotFound("patch run".to_string()));
        }
        if let Some(existing) = state
            .applications
            .iter()
            .find(|a| a.patch_run_id == new_app.patch_run_id && a.name == new_app.name)
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let app = Application {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            patch_run_id: new_app.patch_run_id,
            name: new_app.name.clone(),
            patching_procedure: new_app.patching_procedure.clone(),
        };
        state.applications.push(app.clone());
        Ok(app)
    }

    fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self.read()?.applications.iter().find(|a| a.id == id).cloned())
    }

    fn update_application(&self, app: &Application) -> Result<Application, StoreError> {
        let mut updated = app.clone();
        updated.updated_at = Utc::now();
        let id = app.id;
        replace(&mut self.write()?.applications, |a| a.id == id, "application", updated)
    }

    fn list_applications(&self, patch_run_id: Uuid) -> Result<Vec<Application>, StoreError> {
        let state = self.read()?;
        let apps = state
            .applications
            .iter()
            .filter(|a| a.patch_run_id == patch_run_id)
            .collect();
        Ok(sorted_by_name(apps, |a: &Application| a.name.as_str()))
    }

    fn delete_applications_for_patch_run(&self, patch_run_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .write()?
            .cascade_applications(|a| a.patch_run_id == patch_run_id))
    }

    fn get_or_create_environment(&self, new_env: &NewEnvironment) -> Result<Environment, StoreError> {
        let mut state = self.write()?;
        if !state.applications.iter().any(|a| a.id == new_env.application_id) {
            return Err(StoreError::NotFound("application".to_string()));
        }
        if let Some(existing) = state
            .environments
            .iter()
            .find(|e| e.application_id == new_env.application_id && e.name == new_env.name)
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let env = Environment {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            application_id: new_env.application_id,
            name: new_env.name.clone(),
        };
        state.environments.push(env.clone());
        Ok(env)
    }

    fn get_environment(&self, id: Uuid) -> Result<Option<Environment>, StoreError> {
        Ok(self.read()?.environments.iter().find(|e| e.id == id).cloned())
    }

    fn list_environments(&self, application_id: Uuid) -> Result<Vec<Environment>, StoreError> {
        let state = self.read()?;
        let envs = state
            .environments
            .iter()
            .filter(|e| e.application_id == application_id)
            .collect();
        Ok(sorted_by_name(envs, |e: &Environment| e.name.as_str()))
    }

    fn get_or_create_component(&self, new_component: &NewComponent) -> Result<Component, StoreError> {
        let mut state = self.write()?;
        if !state
            .environments
            .iter()
            .any(|e| e.id == new_component.environment_id)
        {
            return Err(StoreError::NotFound("environment".to_string()));
        }
        if let Some(existing) = state.components.iter().find(|c| {
            c.environment_id == new_component.environment_id && c.name == new_component.name
        }) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let component = Component {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            environment_id: new_component.environment_id,
            name: new_component.name.clone(),
            health_check: new_component.health_check.clone(),
        };
        state.components.push(component.clone());
        Ok(component)
    }

    fn get_component(&self, id: Uuid) -> Result<Option<Component>, StoreError> {
        Ok(self.read()?.components.iter().find(|c| c.id == id).cloned())
    }

    fn list_components(&self, environment_id: Uuid) -> Result<Vec<Component>, StoreError> {
        let state = self.read()?;
        let components = state
            .components
            .iter()
            .filter(|c| c.environment_id == environment_id)
            .collect();
        Ok(sorted_by_name(components, |c: &Component| c.name.as_str()))
    }

    fn set_component_health_check(&self, id: Uuid, health_check: &str) -> Result<Component, StoreError> {
        let mut state = self.write()?;
        let component = state
            .components
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound("component".to_string()))?;
        component.health_check = Some(health_check.to_string());
        component.updated_at = Utc::now();
        Ok(component.clone())
    }

    fn upsert_server(&self, new_server: &NewServer) -> Result<Server, StoreError> {
        let mut state = self.write()?;
        if !state
            .components
            .iter()
            .any(|c| c.id == new_server.component_id)
        {
            return Err(StoreError::NotFound("component".to_string()));
        }
        if let Some(existing) = state
            .servers
            .iter_mut()
            .find(|s| s.component_id == new_server.component_id && s.name == new_server.name)
        {
            existing.overwrite_with(new_server);
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let server = Server {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            component_id: new_server.component_id,
            name: new_server.name.clone(),
            ip_address: new_server.ip_address.clone(),
            vm_name: new_server.vm_name.clone(),
            operating_system: new_server.operating_system.clone(),
            os_version: new_server.os_version.clone(),
            package_updates: new_server.package_updates,
            security_updates: new_server.security_updates,
            patch_window: new_server.patch_window.clone(),
            pinned_packages: new_server.pinned_packages.clone(),
            hardware_uuid: new_server.hardware_uuid.clone(),
            backend_id: new_server.backend_id,
        };
        state.servers.push(server.clone());
        Ok(server)
    }

    fn get_server(&self, id: Uuid) -> Result<Option<Server>, StoreError> {
        Ok(self.read()?.servers.iter().find(|s| s.id == id).cloned())
    }

    fn list_servers(&self, component_id: Uuid) -> Result<Vec<Server>, StoreError> {
        let state = self.read()?;
        let servers = state
            .servers
            .iter()
            .filter(|s| s.component_id == component_id)
            .collect();
        Ok(sorted_by_name(servers, |s: &Server| s.name.as_str()))
    }

    // ===== BACKEND OPERATIONS =====

    fn create_backend(&self, new_backend: &NewBackend) -> Result<Backend, StoreError> {
        let mut state = self.write()?;
        if state.backends.iter().any(|b| b.name == new_backend.name) {
            return Err(StoreError::Conflict(format!(
                "backend '{}' already exists",
                new_backend.name
            )));
        }
        let now = Utc::now();
        let backend = Backend {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: new_backend.name.clone(),
            kind: new_backend.kind.clone(),
            hostname: new_backend.hostname.clone(),
            inventory_port: new_backend.inventory_port,
            api_port: new_backend.api_port,
            username: new_backend.username.clone(),
            token: new_backend.token.clone(),
            ssl: new_backend.ssl,
            ssl_skip_verify: new_backend.ssl_skip_verify,
            ca_cert: new_backend.ca_cert.clone(),
            enabled: new_backend.enabled,
            fact_name: new_backend.fact_name.clone(),
        };
        state.backends.push(backend.clone());
        Ok(backend)
    }

    fn get_backend(&self, id: Uuid) -> Result<Option<Backend>, StoreError> {
        Ok(self.read()?.backends.iter().find(|b| b.id == id).cloned())
    }

    fn list_backends(&self) -> Result<Vec<Backend>, StoreError> {
        let state = self.read()?;
        Ok(sorted_by_name(state.backends.iter().collect(), |b: &Backend| {
            b.name.as_str()
        }))
    }

    fn update_backend(&self, backend: &Backend) -> Result<Backend, StoreError> {
        let mut updated = backend.clone();
        updated.updated_at = Utc::now();
        let id = backend.id;
        replace(&mut self.write()?.backends, |b| b.id == id, "backend", updated)
    }

    // ===== DEFINITION OPERATIONS =====

    fn create_definition(&self, new_definition: &NewDefinition) -> Result<Definition, StoreError> {
        let mut state = self.write()?;
        if state.definitions.iter().any(|d| {
            d.backend_id == new_definition.backend_id
                && d.kind == new_definition.kind
                && d.name == new_definition.name
                && d.environment == new_definition.environment
        }) {
            return Err(StoreError::Conflict(format!(
                "{} '{}' already registered",
                new_definition.kind, new_definition.name
            )));
        }
        let now = Utc::now();
        let definition = Definition {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            backend_id: new_definition.backend_id,
            kind: new_definition.kind.clone(),
            name: new_definition.name.clone(),
            description: new_definition.description.clone(),
            environment: new_definition.environment.clone(),
            enabled: new_definition.enabled,
            is_for_patch_run: new_definition.is_for_patch_run,
            is_for_application: new_definition.is_for_application,
            is_for_component: new_definition.is_for_component,
            is_for_server: new_definition.is_for_server,
        };
        state.definitions.push(definition.clone());
        Ok(definition)
    }

    fn get_definition(&self, id: Uuid) -> Result<Option<Definition>, StoreError> {
        Ok(self.read()?.definitions.iter().find(|d| d.id == id).cloned())
    }

    fn update_definition(&self, definition: &Definition) -> Result<Definition, StoreError> {
        let mut updated = definition.clone();
        updated.updated_at = Utc::now();
        let id = definition.id;
        replace(&mut self.write()?.definitions, |d| d.id == id, "definition", updated)
    }

    fn list_definitions(&self) -> Result<Vec<Definition>, StoreError> {
        let state = self.read()?;
        Ok(sorted_by_name(state.definitions.iter().collect(), |d: &Definition| {
            d.name.as_str()
        }))
    }

    fn list_definition_params(&self, definition_id: Uuid) -> Result<Vec<DefinitionParam>, StoreError> {
        let state = self.read()?;
        let params = state
            .definition_params
            .iter()
            .filter(|p| p.definition_id == definition_id)
            .collect();
        Ok(sorted_by_name(params, |p: &DefinitionParam| p.name.as_str()))
    }

    fn upsert_definition_param(&self, param: &NewDefinitionParam) -> Result<DefinitionParam, StoreError> {
        let mut state = self.write()?;
        if let Some(existing) = state
            .definition_params
            .iter_mut()
            .find(|p| p.definition_id == param.definition_id && p.name == param.name)
        {
            existing.param_type = param.param_type.clone();
            existing.description = param.description.clone();
            existing.default_value = param.default_value.clone();
            existing.is_stale = false;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let created = DefinitionParam {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            definition_id: param.definition_id,
            name: param.name.clone(),
            param_type: param.param_type.clone(),
            description: param.description.clone(),
            default_value: param.default_value.clone(),
            template_value: param.template_value.clone(),
            is_stale: param.is_stale,
        };
        state.definition_params.push(created.clone());
        Ok(created)
    }

    fn update_definition_param(&self, param: &DefinitionParam) -> Result<DefinitionParam, StoreError> {
        let mut updated = param.clone();
        updated.updated_at = Utc::now();
        let id = param.id;
        replace(
            &mut self.write()?.definition_params,
            |p| p.id == id,
            "definition parameter",
            updated,
        )
    }

    fn delete_definition_param(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let before = state.definition_params.len();
        state.definition_params.retain(|p| p.id != id);
        if state.definition_params.len() == before {
            return Err(StoreError::NotFound("definition parameter".to_string()));
        }
        Ok(())
    }

    // ===== JOB OPERATIONS =====

    fn create_job(&self, new_job: &NewJob) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: new_job.name.clone(),
            kind: new_job.kind.clone(),
            status: new_job.status.clone(),
            api_job_id: new_job.api_job_id.clone(),
            api_job_url: new_job.api_job_url.clone(),
            console_url: new_job.console_url.clone(),
            queue_id: new_job.queue_id,
            initiator_kind: new_job.initiator_kind.clone(),
            initiator_id: new_job.initiator_id,
            parent_kind: new_job.parent_kind.clone(),
            parent_id: new_job.parent_id,
            backend_id: new_job.backend_id,
            patch_run_id: new_job.patch_run_id,
            tracking_outcome: new_job.tracking_outcome.clone(),
        };
        self.write()?.jobs.push(job.clone());
        Ok(job)
    }

    fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.read()?.jobs.iter().find(|j| j.id == id).cloned())
    }

    fn resolve_job(&self, job: &Job) -> Result<Job, StoreError> {
        let mut state = self.write()?;
        let stored = state
            .jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| StoreError::NotFound("job".to_string()))?;
        if stored.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "job {} already has status '{}'",
                job.id,
                stored.status.as_deref().unwrap_or_default()
            )));
        }
        let mut updated = job.clone();
        updated.created_at = stored.created_at;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    fn list_jobs_for_initiator(&self, initiator: Initiator) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .read()?
            .jobs
            .iter()
            .filter(|j| j.initiator_kind == initiator.kind() && j.initiator_id == initiator.id())
            .cloned()
            .collect())
    }

    fn list_jobs_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .read()?
            .jobs
            .iter()
            .filter(|j| j.patch_run_id == Some(patch_run_id))
            .cloned()
            .collect())
    }

    // ===== NOTIFICATION CHANNEL OPERATIONS =====

    fn create_channel(&self, new_channel: &NewNotificationChannel) -> Result<NotificationChannel, StoreError> {
        let now = Utc::now();
        let channel = NotificationChannel {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: new_channel.name.clone(),
            webhook_url: new_channel.webhook_url.clone(),
            enabled: new_channel.enabled,
        };
        self.write()?.channels.push(channel.clone());
        Ok(channel)
    }

    fn get_channel(&self, id: Uuid) -> Result<Option<NotificationChannel>, StoreError> {
        Ok(self.read()?.channels.iter().find(|c| c.id == id).cloned())
    }

    fn list_channels(&self) -> Result<Vec<NotificationChannel>, StoreError> {
        let state = self.read()?;
        Ok(sorted_by_name(state.channels.iter().collect(), |c: &NotificationChannel| {
            c.name.as_str()
        }))
    }

    fn update_channel(&self, channel: &NotificationChannel) -> Result<NotificationChannel, StoreError> {
        let mut updated = channel.clone();
        updated.updated_at = Utc::now();
        let id = channel.id;
        replace(&mut self.write()?.channels, |c| c.id == id, "notification channel", updated)
    }

    fn link_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.patch_runs.iter().any(|r| r.id == patch_run_id) {
            return Err(StoreError::NotFound("patch run".to_string()));
        }
        if !state.channels.iter().any(|c| c.id == channel_id) {
            return Err(StoreError::NotFound("notification channel".to_string()));
        }
        let link = PatchRunChannel {
            patch_run_id,
            notification_channel_id: channel_id,
        };
        if !state.patch_run_channels.contains(&link) {
            state.patch_run_channels.push(link);
        }
        Ok(())
    }

    fn unlink_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        self.write()?.patch_run_channels.retain(|l| {
            !(l.patch_run_id == patch_run_id && l.notification_channel_id == channel_id)
        });
        Ok(())
    }

    fn channels_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<NotificationChannel>, StoreError> {
        let state = self.read()?;
        let channels = state
            .channels
            .iter()
            .filter(|c| {
                state.patch_run_channels.iter().any(|l| {
                    l.patch_run_id == patch_run_id && l.notification_channel_id == c.id
                })
            })
            .collect();
        Ok(sorted_by_name(channels, |c: &NotificationChannel| c.name.as_str()))
    }

    // ===== TRELLO BOARD OPERATIONS =====

    fn create_board(&self, new_board: &NewTrelloBoard) -> Result<TrelloBoard, StoreError> {
        let mut state = self.write()?;
        if !state.patch_runs.iter().any(|r| r.id == new_board.patch_run_id) {
            return Err(StoreError::NotFound("patch run".to_string()));
        }
        let now = Utc::now();
        let board = TrelloBoard {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            patch_run_id: new_board.patch_run_id,
            name: new_board.name.clone(),
            description: new_board.description.clone(),
            background: new_board.background.clone(),
            url: None,
            remote_id: None,
        };
        state.boards.push(board.clone());
        Ok(board)
    }

    fn get_board(&self, id: Uuid) -> Result<Option<TrelloBoard>, StoreError> {
        Ok(self.read()?.boards.iter().find(|b| b.id == id).cloned())
    }

    fn update_board(&self, board: &TrelloBoard) -> Result<TrelloBoard, StoreError> {
        let mut updated = board.clone();
        updated.updated_at = Utc::now();
        let id = board.id;
        replace(&mut self.write()?.boards, |b| b.id == id, "trello board", updated)
    }

    fn delete_board(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let before = state.boards.len();
        state.boards.retain(|b| b.id != id);
        if state.boards.len() == before {
            return Err(StoreError::NotFound("trello board".to_string()));
        }
        Ok(())
    }

    fn list_boards(&self, patch_run_id: Uuid) -> Result<Vec<TrelloBoard>, StoreError> {
        let state = self.read()?;
        let boards = state
            .boards
            .iter()
            .filter(|b| b.patch_run_id == patch_run_id)
            .collect();
        Ok(sorted_by_name(boards, |b: &TrelloBoard| b.name.as_str()))
    }
}
