/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Chat webhook channels notified about patch run lifecycle events.
//!
//! The webhook URL carries the channel secret. It is never serialized and
//! must only be logged through `patchwork_utils::logging::redact_url`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::notification_channels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationChannel {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    #[serde(skip_serializing)]
    pub webhook_url: String,
    pub enabled: bool,
}

#[derive(Insertable, Debug, Clone, Deserialize)]
#[diesel(table_name = crate::schema::notification_channels)]
pub struct NewNotificationChannel {
    pub name: String,
    pub webhook_url: String,
    pub enabled: bool,
}

impl NewNotificationChannel {
    pub fn new(name: String, webhook_url: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Channel name cannot be empty".to_string());
        }
        if !(webhook_url.starts_with("https://") || webhook_url.starts_with("http://")) {
            return Err("Webhook URL must be an http(s) URL".to_string());
        }
        Ok(NewNotificationChannel {
            name,
            webhook_url,
            enabled: true,
        })
    }
}

/// Link between a patch run and a channel.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::patch_run_channels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatchRunChannel {
    pub patch_run_id: Uuid,
    pub notification_channel_id: Uuid,
}
