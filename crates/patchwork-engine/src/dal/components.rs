/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Component, NewComponent};
use uuid::Uuid;

pub struct ComponentsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> ComponentsDAL<'a> {
    pub fn get_or_create(&self, new_component: &NewComponent) -> Result<Component, StoreError> {
        use patchwork_models::schema::components::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let inserted: Option<Component> = diesel::insert_into(components)
            .values(new_component)
            .on_conflict((environment_id, name))
            .do_nothing()
            .get_result(conn)
            .optional()?;

        match inserted {
            Some(component) => Ok(component),
            None => Ok(components
                .filter(environment_id.eq(new_component.environment_id))
                .filter(name.eq(&new_component.name))
                .first(conn)?),
        }
    }

    pub fn get(&self, component_id: Uuid) -> Result<Option<Component>, StoreError> {
        use patchwork_models::schema::components::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(components.filter(id.eq(component_id)).first(conn).optional()?)
    }

    pub fn list_for_environment(&self, env_id: Uuid) -> Result<Vec<Component>, StoreError> {
        use patchwork_models::schema::components::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(components
            .filter(environment_id.eq(env_id))
            .order(name.asc())
            .load(conn)?)
    }

    /// Stores the health check. First-write-wins is decided by the caller.
    pub fn set_health_check(&self, component_id: Uuid, value: &str) -> Result<Component, StoreError> {
        use patchwork_models::schema::components::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(components.filter(id.eq(component_id)))
            .set(health_check.eq(Some(value)))
            .get_result(conn)?)
    }
}
