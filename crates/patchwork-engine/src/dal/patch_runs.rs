/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for PatchRun entities.
//!
//! Deleting a run relies on `ON DELETE CASCADE` to remove its hierarchy and
//! channel links.

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{NewPatchRun, PatchRun};
use uuid::Uuid;

/// Handles database operations for PatchRun entities.
pub struct PatchRunsDAL<'a> {
    /// Reference to the main DAL instance.
    pub(crate) dal: &'a DAL,
}

impl<'a> PatchRunsDAL<'a> {
    /// Creates a new patch run in the database.
    ///
    /// # Arguments
    ///
    /// * `new_run` - A reference to the NewPatchRun struct containing the run details.
    ///
    /// # Returns
    ///
    /// The created PatchRun on success.
    pub fn create(&self, new_run: &NewPatchRun) -> Result<PatchRun, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(patch_runs)
            .values(new_run)
            .get_result(conn)?)
    }

    pub fn get(&self, run_id: Uuid) -> Result<Option<PatchRun>, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(patch_runs
            .filter(id.eq(run_id))
            .first(conn)
            .optional()?)
    }

    pub fn update(&self, run: &PatchRun) -> Result<PatchRun, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(patch_runs.filter(id.eq(run.id)))
            .set(run)
            .get_result(conn)?)
    }

    /// Hard deletes a patch run and, through the foreign keys, everything it owns.
    pub fn delete(&self, run_id: Uuid) -> Result<(), StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let deleted = diesel::delete(patch_runs.filter(id.eq(run_id))).execute(conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("patch run {}", run_id)));
        }
        Ok(())
    }

    /// Lists all patch runs, newest first.
    pub fn list(&self) -> Result<Vec<PatchRun>, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(patch_runs.order(created_at.desc()).load(conn)?)
    }

    pub fn latest(&self) -> Result<Option<PatchRun>, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(patch_runs
            .order(created_at.desc())
            .first(conn)
            .optional()?)
    }

    /// Finds the newest run selecting `window`.
    pub fn latest_for_window(&self, window: &str) -> Result<Option<PatchRun>, StoreError> {
        use patchwork_models::schema::patch_runs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(patch_runs
            .filter(patch_window.eq(window))
            .order(created_at.desc())
            .first(conn)
            .optional()?)
    }
}
