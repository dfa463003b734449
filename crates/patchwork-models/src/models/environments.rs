/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An application environment (e.g. `prod`), unique by name within its application.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::environments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Environment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub application_id: Uuid,
    pub name: String,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::environments)]
pub struct NewEnvironment {
    pub application_id: Uuid,
    pub name: String,
}

impl NewEnvironment {
    pub fn new(application_id: Uuid, name: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Environment name cannot be empty".to_string());
        }
        Ok(NewEnvironment {
            application_id,
            name,
        })
    }
}
