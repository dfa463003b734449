/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Backend, NewBackend};
use uuid::Uuid;

/// Handles database operations for backend connection records.
pub struct BackendsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> BackendsDAL<'a> {
    pub fn create(&self, new_backend: &NewBackend) -> Result<Backend, StoreError> {
        use patchwork_models::schema::backends::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(backends)
            .values(new_backend)
            .get_result(conn)?)
    }

    pub fn get(&self, backend_id: Uuid) -> Result<Option<Backend>, StoreError> {
        use patchwork_models::schema::backends::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(backends.filter(id.eq(backend_id)).first(conn).optional()?)
    }

    pub fn list(&self) -> Result<Vec<Backend>, StoreError> {
        use patchwork_models::schema::backends::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(backends.order(name.asc()).load(conn)?)
    }

    pub fn update(&self, backend: &Backend) -> Result<Backend, StoreError> {
        use patchwork_models::schema::backends::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(backends.filter(id.eq(backend.id)))
            .set(backend)
            .get_result(conn)?)
    }
}
