/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{NewNotificationChannel, NotificationChannel, PatchRunChannel};
use patchwork_models::schema::{notification_channels, patch_run_channels};
use uuid::Uuid;

/// Handles notification channels and their links to patch runs.
pub struct NotificationChannelsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> NotificationChannelsDAL<'a> {
    pub fn create(&self, new_channel: &NewNotificationChannel) -> Result<NotificationChannel, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(notification_channels::table)
            .values(new_channel)
            .get_result(conn)?)
    }

    pub fn get(&self, channel_id: Uuid) -> Result<Option<NotificationChannel>, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(notification_channels::table
            .filter(notification_channels::id.eq(channel_id))
            .first(conn)
            .optional()?)
    }

    pub fn list(&self) -> Result<Vec<NotificationChannel>, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(notification_channels::table
            .order(notification_channels::name.asc())
            .load(conn)?)
    }

    pub fn update(&self, channel: &NotificationChannel) -> Result<NotificationChannel, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(notification_channels::table.filter(notification_channels::id.eq(channel.id)))
            .set(channel)
            .get_result(conn)?)
    }

    /// Links a channel to a run. Linking twice is a no-op.
    pub fn link(&self, run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        let conn = &mut self.dal.pool.get()?;

        diesel::insert_into(patch_run_channels::table)
            .values(&PatchRunChannel {
                patch_run_id: run_id,
                notification_channel_id: channel_id,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(())
    }

    pub fn unlink(&self, run_id: Uuid, channel_id: Uuid) -> Result<(), StoreError> {
        let conn = &mut self.dal.pool.get()?;

        diesel::delete(
            patch_run_channels::table
                .filter(patch_run_channels::patch_run_id.eq(run_id))
                .filter(patch_run_channels::notification_channel_id.eq(channel_id)),
        )
        .execute(conn)?;
        Ok(())
    }

    /// Channels linked to a run, enabled or not.
    pub fn list_for_patch_run(&self, run_id: Uuid) -> Result<Vec<NotificationChannel>, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(notification_channels::table
            .inner_join(patch_run_channels::table)
            .filter(patch_run_channels::patch_run_id.eq(run_id))
            .order(notification_channels::name.asc())
            .select(NotificationChannel::as_select())
            .load(conn)?)
    }
}
