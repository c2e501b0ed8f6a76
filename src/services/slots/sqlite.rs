use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use super::{SlotStore, StoreError};
use crate::db::queries;
use crate::models::SlotRow;

/// Slot table kept in the local SQLite database, for development and tests.
pub struct SqliteSlotStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteSlotStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SlotStore for SqliteSlotStore {
    async fn fetch_rows(&self) -> Result<Vec<SlotRow>, StoreError> {
        let db = self
            .db
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))?;
        queries::list_slots(&db).map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn write_row(&self, row: &SlotRow) -> Result<(), StoreError> {
        let db = self
            .db
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))?;
        let updated =
            queries::update_slot(&db, row).map_err(|e| StoreError::Database(e.to_string()))?;
        if !updated {
            return Err(StoreError::MissingRow(row.row_number));
        }
        Ok(())
    }
}
