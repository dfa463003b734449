/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for Job entities.
//!
//! Jobs are never deleted here. [`JobsDAL::resolve`] is the only update path
//! and it filters on `status IS NULL`, so a terminal job cannot be rewritten
//! even by two trackers racing on the same row.

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Initiator, Job, NewJob};
use uuid::Uuid;

/// Handles database operations for Job entities.
pub struct JobsDAL<'a> {
    /// Reference to the main DAL instance.
    pub(crate) dal: &'a DAL,
}

impl<'a> JobsDAL<'a> {
    /// Creates a new pending job.
    ///
    /// # Arguments
    ///
    /// * `new_job` - A reference to the NewJob struct containing the job details.
    ///
    /// # Returns
    ///
    /// The created Job on success.
    pub fn create(&self, new_job: &NewJob) -> Result<Job, StoreError> {
        use patchwork_models::schema::jobs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(jobs).values(new_job).get_result(conn)?)
    }

    pub fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        use patchwork_models::schema::jobs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(jobs.filter(id.eq(job_id)).first(conn).optional()?)
    }

    /// Writes tracking results to a pending job.
    ///
    /// # Returns
    ///
    /// The updated Job, `StoreError::Conflict` if the stored job already has a
    /// status, or `StoreError::NotFound` if it does not exist.
    pub fn resolve(&self, job: &Job) -> Result<Job, StoreError> {
        use patchwork_models::schema::jobs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let updated: Option<Job> = diesel::update(jobs.filter(id.eq(job.id)).filter(status.is_null()))
            .set(job)
            .get_result(conn)
            .optional()?;

        match updated {
            Some(job) => Ok(job),
            None => {
                let exists: Option<Job> = jobs.filter(id.eq(job.id)).first(conn).optional()?;
                match exists {
                    Some(stored) => Err(StoreError::Conflict(format!(
                        "job {} already has status '{}'",
                        stored.id,
                        stored.status.unwrap_or_default()
                    ))),
                    None => Err(StoreError::NotFound(format!("job {}", job.id))),
                }
            }
        }
    }

    pub fn list_for_initiator(&self, initiator: Initiator) -> Result<Vec<Job>, StoreError> {
        use patchwork_models::schema::jobs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(jobs
            .filter(initiator_kind.eq(initiator.kind()))
            .filter(initiator_id.eq(initiator.id()))
            .order(created_at.asc())
            .load(conn)?)
    }

    pub fn list_for_patch_run(&self, run_id: Uuid) -> Result<Vec<Job>, StoreError> {
        use patchwork_models::schema::jobs::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(jobs
            .filter(patch_run_id.eq(run_id))
            .order(created_at.asc())
            .load(conn)?)
    }
}
