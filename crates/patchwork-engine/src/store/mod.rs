/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Store
//!
//! The persistence contract the engine runs against. Two implementations
//! exist: [`MemoryStore`] for tests and embedded use, and the Postgres
//! [`DAL`](crate::dal::DAL).
//!
//! The contract is synchronous. Every method is a single write or read; no
//! operation spans entities transactionally, which is why reconciliation of one
//! patch run must be serialized by its callers.
//!
//! Two rules are enforced here rather than in callers:
//!
//! - `get_or_create_*` never creates a second child with the same name under
//!   the same parent.
//! - [`Store::resolve_job`] only writes jobs that are still pending.

use patchwork_models::models::{
    Application, Backend, Component, Definition, DefinitionParam, Environment, Initiator, Job,
    NewApplication, NewBackend, NewComponent, NewDefinition, NewDefinitionParam, NewEnvironment,
    NewJob, NewNotificationChannel, NewPatchRun, NewServer, NewTrelloBoard, NotificationChannel,
    PatchRun, Server, TrelloBoard,
};
use std::fmt;
use uuid::Uuid;

mod memory;

pub use memory::MemoryStore;

/// Errors returned by store implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    /// A uniqueness or state rule rejected the write.
    Conflict(String),
    Database(String),
    Pool(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "Not found: {}", what),
            StoreError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Pool(msg) => write!(f, "Connection pool error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match e {
            Error::NotFound => StoreError::NotFound("record".to_string()),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Pool(e.to_string())
    }
}

/// Repository contract for the patch-run hierarchy, backends, definitions,
/// jobs, notification channels and Trello boards.
pub trait Store: Send + Sync {
    // ===== PATCH RUN OPERATIONS =====

    fn create_patch_run(&self, new_run: &NewPatchRun) -> Result<PatchRun, StoreError>;
    fn get_patch_run(&self, id: Uuid) -> Result<Option<PatchRun>, StoreError>;
    fn update_patch_run(&self, run: &PatchRun) -> Result<PatchRun, StoreError>;
    /// Deletes a run together with its hierarchy, boards and channel links.
    fn delete_patch_run(&self, id: Uuid) -> Result<(), StoreError>;
    /// All runs, newest first.
    fn list_patch_runs(&self) -> Result<Vec<PatchRun>, StoreError>;
    fn latest_patch_run(&self) -> Result<Option<PatchRun>, StoreError>;
    fn latest_patch_run_for_window(&self, window: &str) -> Result<Option<PatchRun>, StoreError>;

    // ===== HIERARCHY OPERATIONS =====

    fn get_or_create_application(&self, new_app: &NewApplication) -> Result<Application, StoreError>;
    fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError>;
    fn update_application(&self, app: &Application) -> Result<Application, StoreError>;
    /// Applications of a run, ordered by name.
    fn list_applications(&self, patch_run_id: Uuid) -> Result<Vec<Application>, StoreError>;
    /// Deletes every application of a run, cascading to everything below.
    fn delete_applications_for_patch_run(&self, patch_run_id: Uuid) -> Result<usize, StoreError>;

    fn get_or_create_environment(&self, new_env: &NewEnvironment) -> Result<Environment, StoreError>;
    fn get_environment(&self, id: Uuid) -> Result<Option<Environment>, StoreError>;
    fn list_environments(&self, application_id: Uuid) -> Result<Vec<Environment>, StoreError>;

    fn get_or_create_component(&self, new_component: &NewComponent) -> Result<Component, StoreError>;
    fn get_component(&self, id: Uuid) -> Result<Option<Component>, StoreError>;
    fn list_components(&self, environment_id: Uuid) -> Result<Vec<Component>, StoreError>;
    fn set_component_health_check(&self, id: Uuid, health_check: &str) -> Result<Component, StoreError>;

    /// Inserts a server, or overwrites every attribute of the existing server
    /// with the same name in the same component.
    fn upsert_server(&self, new_server: &NewServer) -> Result<Server, StoreError>;
    fn get_server(&self, id: Uuid) -> Result<Option<Server>, StoreError>;
    /// Servers of a component, ordered by name.
    fn list_servers(&self, component_id: Uuid) -> Result<Vec<Server>, StoreError>;

    // ===== BACKEND OPERATIONS =====

    fn create_backend(&self, new_backend: &NewBackend) -> Result<Backend, StoreError>;
    fn get_backend(&self, id: Uuid) -> Result<Option<Backend>, StoreError>;
    fn list_backends(&self) -> Result<Vec<Backend>, StoreError>;
    fn update_backend(&self, backend: &Backend) -> Result<Backend, StoreError>;

    // ===== DEFINITION OPERATIONS =====

    fn create_definition(&self, new_definition: &NewDefinition) -> Result<Definition, StoreError>;
    fn get_definition(&self, id: Uuid) -> Result<Option<Definition>, StoreError>;
    fn update_definition(&self, definition: &Definition) -> Result<Definition, StoreError>;
    fn list_definitions(&self) -> Result<Vec<Definition>, StoreError>;

    fn list_definition_params(&self, definition_id: Uuid) -> Result<Vec<DefinitionParam>, StoreError>;
    /// Inserts a parameter or refreshes the upstream fields of an existing one.
    ///
    /// An existing parameter keeps its `template_value` and is marked current.
    fn upsert_definition_param(&self, param: &NewDefinitionParam) -> Result<DefinitionParam, StoreError>;
    fn update_definition_param(&self, param: &DefinitionParam) -> Result<DefinitionParam, StoreError>;
    fn delete_definition_param(&self, id: Uuid) -> Result<(), StoreError>;

    // ===== JOB OPERATIONS =====

    fn create_job(&self, new_job: &NewJob) -> Result<Job, StoreError>;
    fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;
    /// Writes tracking results to a job that is still pending.
    ///
    /// Returns `StoreError::Conflict` when the stored job already has a status.
    fn resolve_job(&self, job: &Job) -> Result<Job, StoreError>;
    fn list_jobs_for_initiator(&self, initiator: Initiator) -> Result<Vec<Job>, StoreError>;
    fn list_jobs_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<Job>, StoreError>;

    // ===== NOTIFICATION CHANNEL OPERATIONS =====

    fn create_channel(&self, new_channel: &NewNotificationChannel) -> Result<NotificationChannel, StoreError>;
    fn get_channel(&self, id: Uuid) -> Result<Option<NotificationChannel>, StoreError>;
    fn list_channels(&self) -> Result<Vec<NotificationChannel>, StoreError>;
    fn update_channel(&self, channel: &NotificationChannel) -> Result<NotificationChannel, StoreError>;
    fn link_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError>;
    fn unlink_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError>;
    fn channels_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<NotificationChannel>, StoreError>;

    // ===== TRELLO BOARD OPERATIONS =====

    fn create_board(&self, new_board: &NewTrelloBoard) -> Result<TrelloBoard, StoreError>;
    fn get_board(&self, id: Uuid) -> Result<Option<TrelloBoard>, StoreError>;
    fn update_board(&self, board: &TrelloBoard) -> Result<TrelloBoard, StoreError>;
    fn delete_board(&self, id: Uuid) -> Result<(), StoreError>;
    /// Boards of a run, ordered by name.
    fn list_boards(&self, patch_run_id: Uuid) -> Result<Vec<TrelloBoard>, StoreError>;
}
