/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Read-only views over a patch run's hierarchy.

use crate::error::EngineError;
use crate::store::Store;
use patchwork_models::models::{Application, Environment};
use serde::Serialize;
use uuid::Uuid;

/// Column names of the server export, in order.
pub const CSV_HEADER: [&str; 11] = [
    "ServerName",
    "IP",
    "Application",
    "AppEnvironment",
    "AppComponent",
    "OS",
    "OSVersion",
    "Updates",
    "SecurityUpdates",
    "PatchWindow",
    "VMName",
];

/// One server with the names of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRow {
    pub server_id: Uuid,
    pub name: String,
    pub ip_address: String,
    pub application: String,
    pub environment: String,
    pub component: String,
    pub operating_system: String,
    pub os_version: String,
    pub package_updates: Option<i32>,
    pub security_updates: Option<i32>,
    pub patch_window: String,
    pub vm_name: String,
}

impl ServerRow {
    fn csv_record(&self) -> [String; 11] {
        [
            self.name.clone(),
            self.ip_address.clone(),
            self.application.clone(),
            self.environment.clone(),
            self.component.clone(),
            self.operating_system.clone(),
            self.os_version.clone(),
            count(self.package_updates),
            count(self.security_updates),
            self.patch_window.clone(),
            self.vm_name.clone(),
        ]
    }
}

fn count(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// An application with its environments.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationOverview {
    pub application: Application,
    pub environments: Vec<Environment>,
}

fn ensure_run(store: &dyn Store, patch_run_id: Uuid) -> Result<(), EngineError> {
    store
        .get_patch_run(patch_run_id)?
        .map(|_| ())
        .ok_or_else(|| EngineError::not_found("patch run", patch_run_id))
}

/// Flattens the run's hierarchy, ordered by application, environment,
/// component and server name.
pub fn server_rows(store: &dyn Store, patch_run_id: Uuid) -> Result<Vec<ServerRow>, EngineError> {
    ensure_run(store, patch_run_id)?;

    let mut rows = Vec::new();
    for app in store.list_applications(patch_run_id)? {
        for env in store.list_environments(app.id)? {
            for component in store.list_components(env.id)? {
                for server in store.list_servers(component.id)? {
                    rows.push(ServerRow {
                        server_id: server.id,
                        name: server.name,
                        ip_address: server.ip_address,
                        application: app.name.clone(),
                        environment: env.name.clone(),
                        component: component.name.clone(),
                        operating_system: server.operating_system,
                        os_version: server.os_version,
                        package_updates: server.package_updates,
                        security_updates: server.security_updates,
                        patch_window: server.patch_window,
                        vm_name: server.vm_name,
                    });
                }
            }
        }
    }

    rows.sort_by(|a, b| {
        (&a.application, &a.environment, &a.component, &a.name).cmp(&(
            &b.application,
            &b.environment,
            &b.component,
            &b.name,
        ))
    });
    Ok(rows)
}

/// Renders the run's servers as CSV.
pub fn servers_csv(store: &dyn Store, patch_run_id: Uuid) -> Result<String, EngineError> {
    let rows = server_rows(store, patch_run_id)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for row in &rows {
        writer.write_record(row.csv_record()).map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Validation(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| EngineError::Validation(format!("CSV export is not UTF-8: {}", e)))
}

fn csv_error(e: csv::Error) -> EngineError {
    EngineError::Validation(format!("CSV export failed: {}", e))
}

/// Lists the run's applications, each with its environments.
pub fn application_overview(
    store: &dyn Store,
    patch_run_id: Uuid,
) -> Result<Vec<ApplicationOverview>, EngineError> {
    ensure_run(store, patch_run_id)?;

    let mut overview = Vec::new();
    for application in store.list_applications(patch_run_id)? {
        let environments = store.list_environments(application.id)?;
        overview.push(ApplicationOverview {
            application,
            environments,
        });
    }
    overview.sort_by(|a, b| a.application.name.cmp(&b.application.name));
    Ok(overview)
}
