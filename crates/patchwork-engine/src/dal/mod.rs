/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer (DAL) for the Postgres store.
//!
//! `DAL` hands out one accessor per table (`dal.patch_runs()`, `dal.jobs()`,
//! …). Each accessor borrows the DAL and takes a pooled connection per call.
//! `DAL` also implements [`Store`] by delegating to the accessors.

use crate::db::ConnectionPool;
use crate::store::{Store, StoreError};
use patchwork_models::models::{
    Application, Backend, Component, Definition, DefinitionParam, Environment, Initiator, Job,
    NewApplication, NewBackend, NewComponent, NewDefinition, NewDefinitionParam, NewEnvironment,
    NewJob, NewNotificationChannel, NewPatchRun, NewServer, NewTrelloBoard, NotificationChannel,
    PatchRun, Server, TrelloBoard,
};
use uuid::Uuid;

mod applications;
mod backends;
mod components;
mod definition_params;
mod definitions;
mod environments;
mod jobs;
mod notification_channels;
mod patch_runs;
mod servers;
mod trello_boards;

pub use applications::ApplicationsDAL;
pub use backends::BackendsDAL;
pub use components::ComponentsDAL;
pub use definition_params::DefinitionParamsDAL;
pub use definitions::DefinitionsDAL;
pub use environments::EnvironmentsDAL;
pub use jobs::JobsDAL;
pub use notification_channels::NotificationChannelsDAL;
pub use patch_runs::PatchRunsDAL;
pub use servers::ServersDAL;
pub use trello_boards::TrelloBoardsDAL;

/// The main Data Access Layer struct.
#[derive(Clone)]
pub struct DAL {
    /// A connection pool for PostgreSQL database connections.
    pub pool: ConnectionPool,
}

impl DAL {
    /// Creates a new DAL instance over the given pool.
    pub fn new(pool: ConnectionPool) -> Self {
        DAL { pool }
    }

    pub fn patch_runs(&self) -> PatchRunsDAL {
        PatchRunsDAL { dal: self }
    }

    pub fn applications(&self) -> ApplicationsDAL {
        ApplicationsDAL { dal: self }
    }

    pub fn environments(&self) -> EnvironmentsDAL {
        EnvironmentsDAL { dal: self }
    }

    pub fn components(&self) -> ComponentsDAL {
        ComponentsDAL { dal: self }
    }

    pub fn servers(&self) -> ServersDAL {
        ServersDAL { dal: self }
    }

    pub fn backends(&self) -> BackendsDAL {
        BackendsDAL { dal: self }
    }

    pub fn definitions(&self) -> DefinitionsDAL {
        DefinitionsDAL { dal: self }
    }

    pub fn definition_params(&self) -> DefinitionParamsDAL {
        DefinitionParamsDAL { dal: self }
    }

    pub fn jobs(&self) -> JobsDAL {
        JobsDAL { dal: self }
    }

    pub fn notification_channels(&self) -> NotificationChannelsDAL {
        NotificationChannelsDAL { dal: self }
    }

    pub fn trello_boards(&self) -> TrelloBoardsDAL {
        TrelloBoardsDAL { dal: self }
    }
}

impl Store for DAL {
    // ===== PATCH RUN OPERATIONS =====

    fn create_patch_run(&self, new_run: &NewPatchRun) -> Result<PatchRun, StoreError> {
        self.patch_runs().create(new_run)
    }

    fn get_patch_run(&self, id: Uuid) -> Result<Option<PatchRun>, StoreError> {
        self.patch_runs().get(id)
    }

    fn update_patch_run(&self, run: &PatchRun) -> Result<PatchRun, StoreError> {
        self.patch_runs().update(run)
    }

    fn delete_patch_run(&self, id: Uuid) -> Result<(), StoreError> {
        self.patch_runs().delete(id)
    }

    fn list_patch_runs(&self) -> Result<Vec<PatchRun>, StoreError> {
        self.patch_runs().list()
    }

    fn latest_patch_run(&self) -> Result<Option<PatchRun>, StoreError> {
        self.patch_runs().latest()
    }

    fn latest_patch_run_for_window(&self, window: &str) -> Result<Option<PatchRun>, StoreError> {
        self.patch_runs().latest_for_window(window)
    }

    // ===== HIERARCHY OPERATIONS =====

    fn get_or_create_application(&self, new_app: &NewApplication) -> Result<Application, StoreError> {
        self.applications().get_or_create(new_app)
    }

    fn get_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        self.applications().get(id)
    }

    fn update_application(&self, app: &Application) -> Result<Application, StoreError> {
        self.applications().update(app)
    }

    fn list_applications(&self, patch_run_id: Uuid) -> Result<Vec<Application>, StoreError> {
        self.applications().list_for_patch_run(patch_run_id)
    }

    fn delete_applications_for_patch_run(&self, patch_run_id: Uuid) -> Result<usize, StoreError> {
        self.applications().delete_for_patch_run(patch_run_id)
    }

    fn get_or_create_environment(&self, new_env: &NewEnvironment) -> Result<Environment, StoreError> {
        self.environments().get_or_create(new_env)
    }

    fn get_environment(&self, id: Uuid) -> Result<Option<Environment>, StoreError> {
        self.environments().get(id)
    }

    fn list_environments(&self, application_id: Uuid) -> Result<Vec<Environment>, StoreError> {
        self.environments().list_for_application(application_id)
    }

    fn get_or_create_component(&self, new_component: &NewComponent) -> Result<Component, StoreError> {
        self.components().get_or_create(new_component)
    }

    fn get_component(&self, id: Uuid) -> Result<Option<Component>, StoreError> {
        self.components().get(id)
    }

    fn list_components(&self, environment_id: Uuid) -> Result<Vec<Component>, StoreError> {
        self.components().list_for_environment(environment_id)
    }

    fn set_component_health_check(&self, id: Uuid, health_check: &str) -> Result<Component, StoreError> {
        self.components().set_health_check(id, health_check)
    }

    fn upsert_server(&self, new_server: &NewServer) -> Result<Server, StoreError> {
        self.servers().upsert(new_server)
    }

    fn get_server(&self, id: Uuid) -> Result<Option<Server>, StoreError> {
        self.servers().get(id)
    }

    fn list_servers(&self, component_id: Uuid) -> Result<Vec<Server>, StoreError> {
        self.servers().list_for_component(component_id)
    }

    // ===== BACKEND OPERATIONS =====

    fn create_backend(&self, new_backend: &NewBackend) -> Result<Backend, StoreError> {
        self.backends().create(new_backend)
    }

    fn get_backend(&self, id: Uuid) -> Result<Option<Backend>, StoreError> {
        self.backends().get(id)
    }

    fn list_backends(&self) -> Result<Vec<Backend>, StoreError> {
        self.backends().list()
    }

    fn update_backend(&self, backend: &Backend) -> Result<Backend, StoreError> {
        self.backends().update(backend)
    }

    // ===== DEFINITION OPERATIONS =====

    fn create_definition(&self, new_definition: &NewDefinition) -> Result<Definition, StoreError> {
        self.definitions().create(new_definition)
    }

    fn get_definition(&self, id: Uuid) -> Result<Option<Definition>, StoreError> {
        self.definitions().get(id)
    }

    fn update_definition(&self, definition: &Definition) -> Result<Definition, StoreError> {
        self.definitions().update(definition)
    }

    fn list_definitions(&self) -> Result<Vec<Definition>, StoreError> {
        self.definitions().list()
    }

    fn list_definition_params(&self, definition_id: Uuid) -> Result<Vec<DefinitionParam>, StoreError> {
        self.definition_params().list_for_definition(definition_id)
    }

    fn upsert_definition_param(&self, param: &NewDefinitionParam) -> Result<DefinitionParam, StoreError> {
        self.definition_params().upsert(param)
    }

    fn update_definition_param(&self, param: &DefinitionParam) -> Result<DefinitionParam, StoreError> {
        self.definition_params().update(param)
    }

    fn delete_definition_param(&self, id: Uuid) -> Result<(), StoreError> {
        self.definition_params().delete(id)
    }

    // ===== JOB OPERATIONS =====

    fn create_job(&self, new_job: &NewJob) -> Result<Job, StoreError> {
        self.jobs().create(new_job)
    }

    fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        self.jobs().get(id)
    }

    fn resolve_job(&self, job: &Job) -> Result<Job, StoreError> {
        self.jobs().resolve(job)
    }

    fn list_jobs_for_initiator(&self, initiator: Initiator) -> Result<Vec<Job>, StoreError> {
        self.jobs().list_for_initiator(initiator)
    }

    fn list_jobs_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<Job>, StoreError> {
        self.jobs().list_for_patch_run(patch_run_id)
    }

    // ===== NOTIFICATION CHANNEL OPERATIONS =====

    fn create_channel(&self, new_channel: &NewNotificationChannel) -> Result<NotificationChannel, StoreError> {
        self.notification_channels().create(new_channel)
    }

    fn get_channel(&self, id: Uuid) -> Result<Option<NotificationChannel>, StoreError> {
        self.notification_channels().get(id)
    }

    fn list_channels(&self) -> Result<Vec<NotificationChannel>, StoreError> {
        self.notification_channels().list()
    }

    fn update_channel(&self, channel: &NotificationChannel) -> Result<NotificationChannel, StoreError> {
        self.notification_channels().update(channel)
    }

    fn link_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        self.notification_channels().link(patch_run_id, channel_id)
    }

    fn unlink_channel(&self, patch_run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        self.notification_channels().unlink(patch_run_id, channel_id)
    }

    fn channels_for_patch_run(&self, patch_run_id: Uuid) -> Result<Vec<NotificationChannel>, StoreError> {
        self.notification_channels().list_for_patch_run(patch_run_id)
    }

    // ===== TRELLO BOARD OPERATIONS =====

    fn create_board(&self, new_board: &NewTrelloBoard) -> Result<TrelloBoard, StoreError> {
        self.trello_boards().create(new_board)
    }

    fn get_board(&self, id: Uuid) -> Result<Option<TrelloBoard>, StoreError> {
        self.trello_boards().get(id)
    }

    fn update_board(&self, board: &TrelloBoard) -> Result<TrelloBoard, StoreError> {
        self.trello_boards().update(board)
    }

    fn delete_board(&self, id: Uuid) -> Result<(), StoreError> {
        self.trello_boards().delete(id)
    }

    fn list_boards(&self, patch_run_id: Uuid) -> Result<Vec<TrelloBoard>, StoreError> {
        self.trello_boards().list_for_patch_run(patch_run_id)
    }
}
