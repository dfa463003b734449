/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{NewServer, Server};
use uuid::Uuid;

pub struct ServersDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> ServersDAL<'a> {
    /// Inserts the server or overwrites every column of the existing row.
    ///
    /// `NewServer` writes `None` counts as NULL, so a count that is no longer
    /// reported is cleared rather than kept from a previous pass.
    pub fn upsert(&self, new_server: &NewServer) -> Result<Server, StoreError> {
        use patchwork_models::schema::servers::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(servers)
            .values(new_server)
            .on_conflict((component_id, name))
            .do_update()
            .set(new_server)
            .get_result(conn)?)
    }

    pub fn get(&self, server_id: Uuid) -> Result<Option<Server>, StoreError> {
        use patchwork_models::schema::servers::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(servers.filter(id.eq(server_id)).first(conn).optional()?)
    }

    pub fn list_for_component(&self, parent_id: Uuid) -> Result<Vec<Server>, StoreError> {
        use patchwork_models::schema::servers::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(servers
            .filter(component_id.eq(parent_id))
            .order(name.asc())
            .load(conn)?)
    }
}
