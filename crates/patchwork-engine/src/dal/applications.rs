/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Application, NewApplication};
use uuid::Uuid;

/// Handles database operations for Application entities.
pub struct ApplicationsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> ApplicationsDAL<'a> {
    /// Returns the application named `new_app.name` in the run, creating it if needed.
    ///
    /// Relies on the `(patch_run_id, name)` unique index so concurrent callers
    /// converge on a single row.
    pub fn get_or_create(&self, new_app: &NewApplication) -> Result<Application, StoreError> {
        use patchwork_models::schema::applications::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let inserted: Option<Application> = diesel::insert_into(applications)
            .values(new_app)
            .on_conflict((patch_run_id, name))
            .do_nothing()
            .get_result(conn)
            .optional()?;

        match inserted {
            Some(app) => Ok(app),
            None => Ok(applications
                .filter(patch_run_id.eq(new_app.patch_run_id))
                .filter(name.eq(&new_app.name))
                .first(conn)?),
        }
    }

    pub fn get(&self, app_id: Uuid) -> Result<Option<Application>, StoreError> {
        use patchwork_models::schema::applications::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(applications.filter(id.eq(app_id)).first(conn).optional()?)
    }

    pub fn update(&self, app: &Application) -> Result<Application, StoreError> {
        use patchwork_models::schema::applications::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(applications.filter(id.eq(app.id)))
            .set(app)
            .get_result(conn)?)
    }

    pub fn list_for_patch_run(&self, run_id: Uuid) -> Result<Vec<Application>, StoreError> {
        use patchwork_models::schema::applications::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(applications
            .filter(patch_run_id.eq(run_id))
            .order(name.asc())
            .load(conn)?)
    }

    /// Deletes every application of a run. Environments, components and
    /// servers go with them through `ON DELETE CASCADE`.
    pub fn delete_for_patch_run(&self, run_id: Uuid) -> Result<usize, StoreError> {
        use patchwork_models::schema::applications::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::delete(applications.filter(patch_run_id.eq(run_id))).execute(conn)?)
    }
}
