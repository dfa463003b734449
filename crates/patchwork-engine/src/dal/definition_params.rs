/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use diesel::upsert::excluded;
use patchwork_models::models::{DefinitionParam, NewDefinitionParam};
use uuid::Uuid;

pub struct DefinitionParamsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> DefinitionParamsDAL<'a> {
    pub fn list_for_definition(&self, parent_id: Uuid) -> Result<Vec<DefinitionParam>, StoreError> {
        use patchwork_models::schema::definition_params::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(definition_params
            .filter(definition_id.eq(parent_id))
            .order(name.asc())
            .load(conn)?)
    }

    /// Inserts a parameter, or refreshes the upstream columns of the existing
    /// one. `template_value` is local configuration and is never overwritten.
    pub fn upsert(&self, param: &NewDefinitionParam) -> Result<DefinitionParam, StoreError> {
        use patchwork_models::schema::definition_params::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(definition_params)
            .values(param)
            .on_conflict((definition_id, name))
            .do_update()
            .set((
                param_type.eq(excluded(param_type)),
                description.eq(excluded(description)),
                default_value.eq(excluded(default_value)),
                is_stale.eq(false),
            ))
            .get_result(conn)?)
    }

    pub fn update(&self, param: &DefinitionParam) -> Result<DefinitionParam, StoreError> {
        use patchwork_models::schema::definition_params::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(definition_params.filter(id.eq(param.id)))
            .set(param)
            .get_result(conn)?)
    }

    pub fn delete(&self, param_id: Uuid) -> Result<(), StoreError> {
        use patchwork_models::schema::definition_params::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let deleted = diesel::delete(definition_params.filter(id.eq(param_id))).execute(conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("definition parameter {}", param_id)));
        }
        Ok(())
    }
}
