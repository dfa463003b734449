/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Components Module
//!
//! A component is the innermost grouping of servers (e.g. `api`). Its
//! `health_check` is the post-reboot script path run by the cluster patch
//! plan, taken from the first member server that reports one.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fact value reported when a string fact is absent.
pub const UNSET: &str = "UNSET";

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::components)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Component {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub environment_id: Uuid,
    pub name: String,
    /// Post-reboot health check script. `None` until a server reports one.
    pub health_check: Option<String>,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::components)]
pub struct NewComponent {
    pub environment_id: Uuid,
    pub name: String,
    pub health_check: Option<String>,
}

/// Outcome of offering a server's health check fact to its component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckUpdate {
    /// The value was stored because none was set yet.
    Set(String),
    /// The value matches what is stored, or is the unset sentinel.
    Unchanged,
    /// A different value is already stored. The new value is rejected.
    Conflict { existing: String, rejected: String },
}

impl Component {
    /// True when a usable health check is present.
    pub fn has_health_check(&self) -> bool {
        matches!(self.health_check.as_deref(), Some(h) if !h.is_empty() && h != UNSET)
    }

    /// Decides how an observed health check fact applies to this component.
    ///
    /// The first value other than `UNSET` wins. Later differing values are
    /// reported as conflicts and never applied.
    pub fn offer_health_check(&self, observed: &str) -> HealthCheckUpdate {
        if observed.is_empty() || observed == UNSET {
            return HealthCheckUpdate::Unchanged;
        }
        match self.health_check.as_deref() {
            None | Some("") | Some(UNSET) => HealthCheckUpdate::Set(observed.to_string()),
            Some(existing) if existing == observed => HealthCheckUpdate::Unchanged,
            Some(existing) => HealthCheckUpdate::Conflict {
                existing: existing.to_string(),
                rejected: observed.to_string(),
            },
        }
    }
}

impl NewComponent {
    pub fn new(environment_id: Uuid, name: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Component name cannot be empty".to_string());
        }
        Ok(NewComponent {
            environment_id,
            name,
            health_check: None,
        })
    }
}
