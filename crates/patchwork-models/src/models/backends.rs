/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Backends Module
//!
//! A backend is a connection record for a remote automation service: an
//! orchestrator (inventory queries, tasks and plans) or a build server.
//!
//! The orchestrator's `fact_name` is the dotted fact path holding each node's
//! patch window. Its first segment names the patching module, which also
//! prefixes the update count facts and the built-in patch tasks.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

pub const KIND_ORCHESTRATOR: &str = "orchestrator";
pub const KIND_BUILD_SERVER: &str = "build_server";

pub const VALID_KINDS: &[&str] = &[KIND_ORCHESTRATOR, KIND_BUILD_SERVER];

pub const DEFAULT_INVENTORY_PORT: i32 = 8081;
pub const DEFAULT_ORCHESTRATOR_PORT: i32 = 8143;
pub const DEFAULT_BUILD_SERVER_PORT: i32 = 8080;
pub const DEFAULT_FACT_NAME: &str = "pe_patch.patch_group";

// =============================================================================
// Backend Models
// =============================================================================

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::backends)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Backend {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    /// `orchestrator` or `build_server`
    pub kind: String,
    pub hostname: String,
    pub inventory_port: i32,
    pub api_port: i32,
    /// Build server user for basic auth
    pub username: Option<String>,
    /// API token. Never serialized.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub ssl: bool,
    pub ssl_skip_verify: bool,
    /// PEM bundle trusted in addition to the system roots
    pub ca_cert: Option<String>,
    pub enabled: bool,
    /// Dotted fact path holding the patch window
    pub fact_name: String,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::backends)]
pub struct NewBackend {
    pub name: String,
    pub kind: String,
    pub hostname: String,
    pub inventory_port: i32,
    pub api_port: i32,
    pub username: Option<String>,
    pub token: Option<String>,
    pub ssl: bool,
    pub ssl_skip_verify: bool,
    pub ca_cert: Option<String>,
    pub enabled: bool,
    pub fact_name: String,
}

impl NewBackend {
    /// Creates a new backend record with the defaults for its kind.
    ///
    /// Orchestrators listen on 8143 and build servers on 8080. SSL is on and
    /// the patch window fact is `pe_patch.patch_group`.
    pub fn new(name: String, kind: &str, hostname: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Backend name cannot be empty".to_string());
        }
        if hostname.trim().is_empty() {
            return Err("Backend hostname cannot be empty".to_string());
        }
        if !VALID_KINDS.contains(&kind) {
            return Err(format!(
                "Invalid backend kind '{}'. Must be one of: {:?}",
                kind, VALID_KINDS
            ));
        }

        let api_port = if kind == KIND_ORCHESTRATOR {
            DEFAULT_ORCHESTRATOR_PORT
        } else {
            DEFAULT_BUILD_SERVER_PORT
        };

        Ok(NewBackend {
            name,
            kind: kind.to_string(),
            hostname,
            inventory_port: DEFAULT_INVENTORY_PORT,
            api_port,
            username: None,
            token: None,
            ssl: true,
            ssl_skip_verify: false,
            ca_cert: None,
            enabled: true,
            fact_name: DEFAULT_FACT_NAME.to_string(),
        })
    }
}

impl Backend {
    pub fn is_orchestrator(&self) -> bool {
        self.kind == KIND_ORCHESTRATOR
    }

    pub fn is_build_server(&self) -> bool {
        self.kind == KIND_BUILD_SERVER
    }

    fn scheme(&self) -> &'static str {
        if self.ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL of the automation API.
    pub fn api_base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.hostname, self.api_port)
    }

    /// Base URL of the inventory API.
    pub fn inventory_base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.hostname, self.inventory_port)
    }

    /// First segment of `fact_name`, e.g. `pe_patch`.
    pub fn patching_module(&self) -> &str {
        self.fact_name.split('.').next().unwrap_or(&self.fact_name)
    }
}
