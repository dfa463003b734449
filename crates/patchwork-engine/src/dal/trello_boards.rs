/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::store::StoreError;
use diesel::prelude::*;
use patchwork_models::models::{NewTrelloBoard, TrelloBoard};
use patchwork_models::schema::trello_boards;
use uuid::Uuid;

/// Handles Trello board records. Boards go with their run through
/// `ON DELETE CASCADE`.
pub struct TrelloBoardsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> TrelloBoardsDAL<'a> {
    pub fn create(&self, new_board: &NewTrelloBoard) -> Result<TrelloBoard, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(trello_boards::table)
            .values(new_board)
            .get_result(conn)?)
    }

    pub fn get(&self, board_id: Uuid) -> Result<Option<TrelloBoard>, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(trello_boards::table
            .filter(trello_boards::id.eq(board_id))
            .first(conn)
            .optional()?)
    }

    pub fn update(&self, board: &TrelloBoard) -> Result<TrelloBoard, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(trello_boards::table.filter(trello_boards::id.eq(board.id)))
            .set(board)
            .get_result(conn)?)
    }

    pub fn delete(&self, board_id: Uuid) -> Result<(), StoreError> {
        let conn = &mut self.dal.pool.get()?;

        let deleted =
            diesel::delete(trello_boards::table.filter(trello_boards::id.eq(board_id)))
                .execute(conn)?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("trello board {}", board_id)));
        }
        Ok(())
    }

    pub fn list_for_patch_run(&self, run_id: Uuid) -> Result<Vec<TrelloBoard>, StoreError> {
        let conn = &mut self.dal.pool.get()?;

        Ok(trello_boards::table
            .filter(trello_boards::patch_run_id.eq(run_id))
            .order(trello_boards::name.asc())
            .load(conn)?)
    }
}
