/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Servers Module
//!
//! Servers are inventory nodes placed under a component. Every
//! reconciliation pass overwrites all of a server's attributes with what
//! the inventory reported, so [`NewServer`] doubles as the update changeset.
//!
//! Update counts are `None` when the patching module never reported them,
//! which is distinct from a reported count of zero.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::servers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Server {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub component_id: Uuid,
    /// Node certname
    pub name: String,
    pub ip_address: String,
    pub vm_name: String,
    pub operating_system: String,
    pub os_version: String,
    pub package_updates: Option<i32>,
    pub security_updates: Option<i32>,
    pub patch_window: String,
    pub pinned_packages: Vec<String>,
    pub hardware_uuid: String,
    /// Backend connection that reported this node
    pub backend_id: Option<Uuid>,
}

/// Attributes of a server as observed in inventory.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::servers)]
#[diesel(treat_none_as_null = true)]
pub struct NewServer {
    pub component_id: Uuid,
    pub name: String,
    pub ip_address: String,
    pub vm_name: String,
    pub operating_system: String,
    pub os_version: String,
    pub package_updates: Option<i32>,
    pub security_updates: Option<i32>,
    pub patch_window: String,
    pub pinned_packages: Vec<String>,
    pub hardware_uuid: String,
    pub backend_id: Option<Uuid>,
}

impl NewServer {
    /// Creates a server placeholder with only identity fields set.
    pub fn new(component_id: Uuid, name: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        Ok(NewServer {
            component_id,
            name,
            ip_address: String::new(),
            vm_name: String::new(),
            operating_system: String::new(),
            os_version: String::new(),
            package_updates: None,
            security_updates: None,
            patch_window: String::new(),
            pinned_packages: Vec::new(),
            hardware_uuid: String::new(),
            backend_id: None,
        })
    }
}

impl Server {
    /// Applies an inventory observation, replacing every attribute.
    pub fn overwrite_with(&mut self, observed: &NewServer) {
        self.component_id = observed.component_id;
        self.name = observed.name.clone();
        self.ip_address = observed.ip_address.clone();
        self.vm_name = observed.vm_name.clone();
        self.operating_system = observed.operating_system.clone();
        self.os_version = observed.os_version.clone();
        self.package_updates = observed.package_updates;
        self.security_updates = observed.security_updates;
        self.patch_window = observed.patch_window.clone();
        self.pinned_packages = observed.pinned_packages.clone();
        self.hardware_uuid = observed.hardware_uuid.clone();
        self.backend_id = observed.backend_id;
    }
}
