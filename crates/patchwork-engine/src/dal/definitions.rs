/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{Definition, NewDefinition};
use uuid::Uuid;

/// Handles database operations for task, plan and build definitions.
pub struct DefinitionsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> DefinitionsDAL<'a> {
    pub fn create(&self, new_definition: &NewDefinition) -> Result<Definition, StoreError> {
        use patchwork_models::schema::definitions::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(definitions)
            .values(new_definition)
            .get_result(conn)?)
    }

    pub fn get(&self, definition_id: Uuid) -> Result<Option<Definition>, StoreError> {
        use patchwork_models::schema::definitions::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(definitions
            .filter(id.eq(definition_id))
            .first(conn)
            .optional()?)
    }

    pub fn update(&self, definition: &Definition) -> Result<Definition, StoreError> {
        use patchwork_models::schema::definitions::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(definitions.filter(id.eq(definition.id)))
            .set(definition)
            .get_result(conn)?)
    }

    pub fn list(&self) -> Result<Vec<Definition>, StoreError> {
        use patchwork_models::schema::definitions::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(definitions.order(name.asc()).load(conn)?)
    }
}
