/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Patch Runs Module
//!
//! A patch run is a scheduled patching campaign. It owns the discovered
//! Application → Environment → Component → Server hierarchy and selects its
//! servers with an opaque `patch_window` fact value.
//!
//! ## Core Data Model
//!
//! - `id`: Uuid - Unique identifier for the patch run
//! - `created_at` / `updated_at`: DateTime<Utc> - Managed by the database
//! - `name`: String - Display name, defaulting to `Patching: <ISO year>-W<ISO week>`
//! - `description`: Option<String> - Free text shown in notifications
//! - `patch_window`: String - Fact value matched against inventory
//! - `start_time` / `end_time`: Option<DateTime<Utc>> - Planned campaign window

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a patch run in the system.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::patch_runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct PatchRun {
    /// Unique identifier for the patch run
    pub id: Uuid,
    /// Timestamp when the patch run was created
    pub created_at: DateTime<Utc>,
    /// Timestamp when the patch run was last updated
    pub updated_at: DateTime<Utc>,
    /// Display name of the patch run
    pub name: String,
    /// Optional description of the patch run
    pub description: Option<String>,
    /// Fact value selecting the servers of this run
    pub patch_window: String,
    /// Planned start of the campaign
    pub start_time: Option<DateTime<Utc>>,
    /// Planned end of the campaign
    pub end_time: Option<DateTime<Utc>>,
}

/// Represents a new patch run to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::patch_runs)]
pub struct NewPatchRun {
    pub name: String,
    pub description: Option<String>,
    pub patch_window: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Default patch run name for the ISO week containing `date`.
pub fn default_name_for(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("Patching: {}-W{}", week.year(), week.week())
}

/// Default patch run name for the current ISO week.
pub fn default_name() -> String {
    default_name_for(Utc::now().date_naive())
}

impl NewPatchRun {
    /// Creates a new `NewPatchRun` instance.
    ///
    /// # Arguments
    ///
    /// * `name` - Optional display name. Blank or missing names get [`default_name`].
    /// * `description` - Optional description
    /// * `patch_window` - Fact value selecting the run's servers
    /// * `start_time` / `end_time` - Optional campaign window
    ///
    /// # Returns
    ///
    /// A `Result` containing a new `NewPatchRun` instance if successful, or an error message if validation fails.
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        patch_window: String,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        if patch_window.trim().is_empty() {
            return Err("Patch window cannot be empty".to_string());
        }

        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end < start {
                return Err("End time cannot be before start time".to_string());
            }
        }

        let name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => default_name(),
        };

        Ok(NewPatchRun {
            name,
            description: description.filter(|d| !d.trim().is_empty()),
            patch_window,
            start_time,
            end_time,
        })
    }
}
