use chrono::NaiveDate;

/// Number of columns a slot row occupies in the store (A through G).
pub const SLOT_COLUMNS: usize = 7;

/// Absolute address of the first data row; row 1 holds the headers.
pub const FIRST_DATA_ROW: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Reserved,
    Other(String),
}

impl SlotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SlotStatus::Available => "disponible",
            SlotStatus::Reserved => "reservado",
            SlotStatus::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "disponible" => SlotStatus::Available,
            "reservado" => SlotStatus::Reserved,
            _ => SlotStatus::Other(s.to_string()),
        }
    }

    pub fn is_bookable(&self) -> bool {
        *self == SlotStatus::Available
    }
}

/// One bookable (date, time) unit as stored in the slot sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRow {
    pub row_number: u32,
    pub id: String,
    pub date: String,
    pub time: String,
    pub extra: String,
    pub status: SlotStatus,
    pub patient_label: String,
    pub phone: String,
}

impl SlotRow {
    /// Decode positional cells. The Sheets API drops trailing empty cells,
    /// so short rows are padded with empty strings.
    pub fn from_cells(row_number: u32, cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        Self {
            row_number,
            id: cell(0),
            date: cell(1),
            time: cell(2),
            extra: cell(3),
            status: SlotStatus::parse(&cell(4)),
            patient_label: cell(5),
            phone: cell(6),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.clone(),
            self.time.clone(),
            self.extra.clone(),
            self.status.as_str().to_string(),
            self.patient_label.clone(),
            self.phone.clone(),
        ]
    }

    /// `None` when the date cell is not a valid `YYYY-MM-DD` calendar date.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}
