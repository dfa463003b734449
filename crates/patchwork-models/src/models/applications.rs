/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Applications are the top level of the discovered hierarchy, unique by name
//! within their patch run.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an application discovered for a patch run.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Application {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning patch run
    pub patch_run_id: Uuid,
    pub name: String,
    /// Link to the application's patching procedure document
    pub patching_procedure: Option<String>,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::applications)]
pub struct NewApplication {
    pub patch_run_id: Uuid,
    pub name: String,
    pub patching_procedure: Option<String>,
}

/// Returns the procedure value only when it looks like a link.
///
/// Inventory reports sentinel strings such as `UNSET` for missing facts,
/// which must not be stored as a procedure URL.
pub fn procedure_url(value: &str) -> Option<String> {
    if value.starts_with("http") {
        Some(value.to_string())
    } else {
        None
    }
}

impl NewApplication {
    pub fn new(patch_run_id: Uuid, name: String, patching_procedure: &str) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        Ok(NewApplication {
            patch_run_id,
            name,
            patching_procedure: procedure_url(patching_procedure),
        })
    }
}
