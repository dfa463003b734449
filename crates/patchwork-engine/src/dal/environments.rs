/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Environment, NewEnvironment};
use uuid::Uuid;

pub struct EnvironmentsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> EnvironmentsDAL<'a> {
    pub fn get_or_create(&self, new_env: &NewEnvironment) -> Result<Environment, StoreError> {
        use patchwork_models::schema::environments::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let inserted: Option<Environment> = diesel::insert_into(environments)
            .values(new_env)
            .on_conflict((application_id, name))
            .do_nothing()
            .get_result(conn)
            .optional()?;

        match inserted {
            Some(env) => Ok(env),
            None => Ok(environments
                .filter(application_id.eq(new_env.application_id))
                .filter(name.eq(&new_env.name))
                .first(conn)?),
        }
    }

    pub fn get(&self, env_id: Uuid) -> Result<Option<Environment>, StoreError> {
        use patchwork_models::schema::environments::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(environments.filter(id.eq(env_id)).first(conn).optional()?)
    }

    pub fn list_for_application(&self, app_id: Uuid) -> Result<Vec<Environment>, StoreError> {
        use patchwork_models::schema::environments::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(environments
            .filter(application_id.eq(app_id))
            .order(name.asc())
            .load(conn)?)
    }
}
