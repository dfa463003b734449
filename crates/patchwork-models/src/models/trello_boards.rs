/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Trello Boards Module
//!
//! A Trello board is a checklist view of one patch run: one card per
//! application environment, one checklist per component and one item per
//! server. Boards belong to their run and are deleted with it.
//!
//! ## Core Data Model
//!
//! - `patch_run_id`: Uuid - Owning patch run
//! - `name`: String - Board title, defaulting to `Patching: <YYYY-MM-DD>`
//! - `description`: String - Markdown shown in the board header
//! - `background`: String - One of [`BACKGROUNDS`]
//! - `url`: Option<String> - Short link, set once the board exists remotely
//! - `remote_id`: Option<String> - Trello board id, set once the board exists remotely

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Background colors accepted by Trello.
pub const BACKGROUNDS: [&str; 9] = [
    "blue", "orange", "green", "red", "purple", "pink", "lime", "sky", "grey",
];

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::trello_boards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TrelloBoard {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patch_run_id: Uuid,
    pub name: String,
    pub description: String,
    pub background: String,
    pub url: Option<String>,
    #[serde(rename = "trello_board_id")]
    pub remote_id: Option<String>,
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::trello_boards)]
pub struct NewTrelloBoard {
    pub patch_run_id: Uuid,
    pub name: String,
    pub description: String,
    pub background: String,
}

/// Default board name for boards created on `date`.
pub fn default_name_for(date: NaiveDate) -> String {
    format!("Patching: {}", date.format("%Y-%m-%d"))
}

impl NewTrelloBoard {
    /// Creates a new `NewTrelloBoard`.
    ///
    /// Defaults are applied by the caller; this only rejects values Trello
    /// would refuse.
    pub fn new(
        patch_run_id: Uuid,
        name: String,
        description: String,
        background: String,
    ) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Board name cannot be empty".to_string());
        }
        if !BACKGROUNDS.contains(&background.as_str()) {
            return Err(format!(
                "Unknown board background '{}', expected one of: {}",
                background,
                BACKGROUNDS.join(", ")
            ));
        }
        Ok(NewTrelloBoard {
            patch_run_id,
            name,
            description,
            background,
        })
    }
}
