use tokio::sync::Mutex;

use crate::models::{SlotRow, SlotStatus};
use crate::services::slots::{SlotStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub date: String,
    pub time: String,
    pub patient_label: String,
    pub phone: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("slot {date} {time} is no longer available")]
    SlotTaken { date: String, time: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serializes every reservation made by this process through a single writer.
///
/// The slot sheet has no compare-and-swap, so two reservations racing for the
/// same row would both read it as open and the last write would silently win.
/// Holding the desk lock across read-check-write closes that window between
/// sessions of this process. Writers outside the process (someone editing the
/// sheet by hand, a second instance) are only detected by the verification
/// read after the write, which narrows the window but cannot close it.
#[derive(Default)]
pub struct ReservationDesk {
    writer: Mutex<()>,
}

impl ReservationDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reserve(
        &self,
        store: &dyn SlotStore,
        request: &ReservationRequest,
    ) -> Result<SlotRow, ReservationError> {
        let _writer = self.writer.lock().await;

        let rows = store.fetch_rows().await?;
        let Some(mut slot) = find_open_slot(&rows, &request.date, &request.time).cloned() else {
            tracing::info!(date = %request.date, time = %request.time, "slot no longer open");
            return Err(taken(request));
        };

        slot.status = SlotStatus::Reserved;
        slot.patient_label = request.patient_label.clone();
        slot.phone = request.phone.clone();
        store.write_row(&slot).await?;

        let rows = store.fetch_rows().await?;
        let landed = rows.iter().any(|row| {
            row.row_number == slot.row_number
                && row.status == SlotStatus::Reserved
                && row.patient_label.trim() == slot.patient_label.trim()
                && same_phone(&row.phone, &slot.phone)
        });
        if !landed {
            tracing::warn!(
                row = slot.row_number,
                date = %request.date,
                time = %request.time,
                "reservation overwritten by another writer"
            );
            return Err(taken(request));
        }

        tracing::info!(
            row = slot.row_number,
            date = %request.date,
            time = %request.time,
            "slot reserved"
        );
        Ok(slot)
    }
}

fn taken(request: &ReservationRequest) -> ReservationError {
    ReservationError::SlotTaken {
        date: request.date.clone(),
        time: request.time.clone(),
    }
}

/// Stores may hand a phone back reformatted (a spreadsheet reading it as a
/// number drops leading zeros), so compare the significant digits only.
fn same_phone(stored: &str, written: &str) -> bool {
    fn digits(s: &str) -> String {
        s.chars()
            .filter(char::is_ascii_digit)
            .skip_while(|c| *c == '0')
            .collect()
    }
    digits(stored) == digits(written)
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn find_open_slot<'a>(rows: &'a [SlotRow], date: &str, time: &str) -> Option<&'a SlotRow> {
    let date = normalize(date);
    let time = normalize(time);
    rows.iter().find(|row| {
        normalize(&row.date) == date && normalize(&row.time) == time && row.status.is_bookable()
    })
}
