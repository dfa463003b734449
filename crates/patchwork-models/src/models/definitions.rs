/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Definitions Module
//!
//! Definitions are named, parameterized operations registered against a
//! backend: orchestrator tasks and plans, or build server jobs.
//!
//! - Task and plan names are `module::name`. A bare `module` means `module::init`.
//! - Build names are job paths such as `folder/job`, without surrounding slashes.
//!
//! Scope flags restrict the hierarchy levels a definition may be dispatched
//! against. Tasks and plans default to servers only, builds to patch runs only.
//!
//! Parameters mirror the upstream metadata. A parameter that disappears
//! upstream is deleted unless it carries a local template, in which case it
//! is kept and flagged `is_stale`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KIND_TASK: &str = "task";
pub const KIND_PLAN: &str = "plan";
pub const KIND_BUILD: &str = "build";

pub const VALID_KINDS: &[&str] = &[KIND_TASK, KIND_PLAN, KIND_BUILD];

pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Hierarchy level a definition is dispatched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    PatchRun,
    Application,
    Component,
    Server,
}

impl std::fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScopeLevel::PatchRun => "patch run",
            ScopeLevel::Application => "application",
            ScopeLevel::Component => "component",
            ScopeLevel::Server => "server",
        };
        f.write_str(s)
    }
}

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct Definition {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub backend_id: Uuid,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    /// Backend code environment the definition runs in
    pub environment: String,
    pub enabled: bool,
    pub is_for_patch_run: bool,
    pub is_for_application: bool,
    pub is_for_component: bool,
    pub is_for_server: bool,
}

impl Definition {
    /// Whether the scope flags allow dispatch against `level`.
    pub fn allows(&self, level: ScopeLevel) -> bool {
        match level {
            ScopeLevel::PatchRun => self.is_for_patch_run,
            ScopeLevel::Application => self.is_for_application,
            ScopeLevel::Component => self.is_for_component,
            ScopeLevel::Server => self.is_for_server,
        }
    }

    /// Splits a task or plan name into module and name.
    pub fn module_and_name(&self) -> (&str, &str) {
        split_module_name(&self.name)
    }
}

/// Splits `module::name`, mapping a bare module to its `init` entry point.
pub fn split_module_name(full: &str) -> (&str, &str) {
    match full.split_once("::") {
        Some((module, name)) if !name.is_empty() => (module, name),
        Some((module, _)) => (module, "init"),
        None => (full, "init"),
    }
}

/// Normalizes a task or plan name to `module::name`.
pub fn normalize_module_name(full: &str) -> String {
    let (module, name) = split_module_name(full.trim());
    format!("{}::{}", module, name)
}

/// Strips leading and trailing slashes from a build job path.
pub fn normalize_job_path(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::definitions)]
pub struct NewDefinition {
    pub backend_id: Uuid,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub environment: String,
    pub enabled: bool,
    pub is_for_patch_run: bool,
    pub is_for_application: bool,
    pub is_for_component: bool,
    pub is_for_server: bool,
}

impl NewDefinition {
    /// Creates a new definition with the defaults for its kind.
    ///
    /// # Arguments
    ///
    /// * `backend_id` - Backend the definition runs on
    /// * `kind` - `task`, `plan` or `build`
    /// * `name` - `module::name` for tasks and plans, a job path for builds
    pub fn new(backend_id: Uuid, kind: &str, name: &str) -> Result<Self, String> {
        if name.trim().trim_matches('/').is_empty() {
            return Err("Definition name cannot be empty".to_string());
        }
        if !VALID_KINDS.contains(&kind) {
            return Err(format!(
                "Invalid definition kind '{}'. Must be one of: {:?}",
                kind, VALID_KINDS
            ));
        }

        let is_build = kind == KIND_BUILD;
        let name = if is_build {
            normalize_job_path(name)
        } else {
            normalize_module_name(name)
        };

        Ok(NewDefinition {
            backend_id,
            kind: kind.to_string(),
            name,
            description: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            enabled: true,
            is_for_patch_run: is_build,
            is_for_application: false,
            is_for_component: false,
            is_for_server: !is_build,
        })
    }
}

// =============================================================================
// Definition Parameters
// =============================================================================

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::definition_params)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct DefinitionParam {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub definition_id: Uuid,
    pub name: String,
    /// Backend type tag, e.g. `Optional[Integer]`
    pub param_type: String,
    pub description: Option<String>,
    pub default_value: Option<String>,
    /// Template rendered against the dispatch target
    pub template_value: Option<String>,
    /// Set when the parameter no longer exists upstream
    pub is_stale: bool,
}

impl DefinitionParam {
    pub fn has_template(&self) -> bool {
        self.template_value
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::definition_params)]
pub struct NewDefinitionParam {
    pub definition_id: Uuid,
    pub name: String,
    pub param_type: String,
    pub description: Option<String>,
    pub default_value: Option<String>,
    pub template_value: Option<String>,
    pub is_stale: bool,
}

impl NewDefinitionParam {
    pub fn new(definition_id: Uuid, name: String, param_type: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Parameter name cannot be empty".to_string());
        }
        let param_type = if param_type.trim().is_empty() {
            "String".to_string()
        } else {
            param_type
        };
        Ok(NewDefinitionParam {
            definition_id,
            name,
            param_type,
            description: None,
            default_value: None,
            template_value: None,
            is_stale: false,
        })
    }
}
