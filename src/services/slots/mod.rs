pub mod sheets;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::SlotRow;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slot store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("slot store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("slot database error: {0}")]
    Database(String),

    #[error("row {0} does not exist in the slot store")]
    MissingRow(u32),
}

/// The shared table of bookable slots. Rows are only ever read and updated
/// in place; the store owns their creation and deletion.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<SlotRow>, StoreError>;

    /// Overwrite the row at `row.row_number` with the row's current values.
    async fn write_row(&self, row: &SlotRow) -> Result<(), StoreError>;
}

pub use sheets::SheetsSlotStore;
pub use sqlite::SqliteSlotStore;
