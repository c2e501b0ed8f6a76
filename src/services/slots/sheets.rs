use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SlotStore, StoreError};
use crate::models::slot::FIRST_DATA_ROW;
use crate::models::SlotRow;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const PATIENT_LABEL_COLUMN: usize = 5;
const PHONE_COLUMN: usize = 6;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

/// Slot table backed by a Google Sheets spreadsheet, accessed through the
/// values API with a pre-issued OAuth bearer token.
pub struct SheetsSlotStore {
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
    client: reqwest::Client,
}

impl SheetsSlotStore {
    pub fn new(spreadsheet_id: String, sheet_name: String, access_token: String) -> Self {
        Self {
            spreadsheet_id,
            sheet_name,
            access_token,
            client: reqwest::Client::new(),
        }
    }

    fn read_range(&self) -> String {
        format!("{}!A{FIRST_DATA_ROW}:G", self.sheet_name)
    }

    fn row_range(&self, row_number: u32) -> String {
        format!("{}!A{row_number}:G{row_number}", self.sheet_name)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{SHEETS_API}/{}/values/{range}", self.spreadsheet_id)
    }
}

/// Sheets returns numbers and booleans unquoted when a cell was typed that way.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_rows(range: ValueRange) -> Vec<SlotRow> {
    range
        .values
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let cells: Vec<String> = cells.iter().map(cell_text).collect();
            SlotRow::from_cells(FIRST_DATA_ROW + i as u32, &cells)
        })
        .collect()
}

/// Cells for a row write. Writes go through `USER_ENTERED` so dates and times
/// keep their sheet formatting, but patient text is forced to a literal:
/// otherwise a phone like `0387...` comes back as a number without its
/// leading zero, and a label starting with `=` would be run as a formula.
fn write_cells(row: &SlotRow) -> Vec<String> {
    let mut cells = row.to_cells();
    for i in [PATIENT_LABEL_COLUMN, PHONE_COLUMN] {
        if !cells[i].is_empty() {
            cells[i] = format!("'{}", cells[i]);
        }
    }
    cells
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SlotStore for SheetsSlotStore {
    async fn fetch_rows(&self) -> Result<Vec<SlotRow>, StoreError> {
        let resp = self
            .client
            .get(self.values_url(&self.read_range()))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let range: ValueRange = ensure_success(resp).await?.json().await?;
        Ok(decode_rows(range))
    }

    async fn write_row(&self, row: &SlotRow) -> Result<(), StoreError> {
        let range = self.row_range(row.row_number);
        let body = ValueRangeUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: vec![write_cells(row)],
        };

        let resp = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        ensure_success(resp).await?;
        tracing::debug!(row = row.row_number, "slot row written to sheet");
        Ok(())
    }
}
