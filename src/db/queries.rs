use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{DialogState, Session, SessionData, SlotRow, SlotStatus};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Sessions ──

pub fn get_session(conn: &Connection, id: &str) -> anyhow::Result<Option<Session>> {
    let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
    let mut stmt = conn.prepare(
        "SELECT id, state, data, last_activity, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
    )?;

    let result = stmt.query_row(params![id, now], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    });

    match result {
        Ok((id, state_str, data_json, last_activity_str, expires_at_str)) => {
            let data: SessionData = serde_json::from_str(&data_json).unwrap_or_else(|e| {
                tracing::warn!(session = %id, error = %e, "unreadable session data, starting over");
                SessionData::default()
            });

            let last_activity = NaiveDateTime::parse_from_str(&last_activity_str, TIMESTAMP_FORMAT)
                .unwrap_or_else(|_| Utc::now().naive_utc());
            let expires_at = NaiveDateTime::parse_from_str(&expires_at_str, TIMESTAMP_FORMAT)
                .unwrap_or_else(|_| Utc::now().naive_utc());

            Ok(Some(Session {
                id,
                state: DialogState::parse(&state_str),
                data,
                last_activity,
                expires_at,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_session(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    let data_json = serde_json::to_string(&session.data)?;
    let last_activity = session.last_activity.format(TIMESTAMP_FORMAT).to_string();
    let expires_at = session.expires_at.format(TIMESTAMP_FORMAT).to_string();

    conn.execute(
        "INSERT INTO sessions (id, state, data, last_activity, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           state = excluded.state,
           data = excluded.data,
           last_activity = excluded.last_activity,
           expires_at = excluded.expires_at",
        params![
            session.id,
            session.state.as_str(),
            data_json,
            last_activity,
            expires_at
        ],
    )?;
    Ok(())
}

pub fn expire_old_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
    Ok(count)
}

// ── Slots ──

pub fn list_slots(conn: &Connection) -> rusqlite::Result<Vec<SlotRow>> {
    let mut stmt = conn.prepare(
        "SELECT row_number, id, date, time, extra, status, patient_label, phone
         FROM slots ORDER BY row_number ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        let status: String = row.get(5)?;
        Ok(SlotRow {
            row_number: row.get(0)?,
            id: row.get(1)?,
            date: row.get(2)?,
            time: row.get(3)?,
            extra: row.get(4)?,
            status: SlotStatus::parse(&status),
            patient_label: row.get(6)?,
            phone: row.get(7)?,
        })
    })?;

    rows.collect()
}

pub fn update_slot(conn: &Connection, slot: &SlotRow) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE slots SET id = ?1, date = ?2, time = ?3, extra = ?4, status = ?5,
           patient_label = ?6, phone = ?7
         WHERE row_number = ?8",
        params![
            slot.id,
            slot.date,
            slot.time,
            slot.extra,
            slot.status.as_str(),
            slot.patient_label,
            slot.phone,
            slot.row_number,
        ],
    )?;
    Ok(count > 0)
}

pub fn insert_slot(conn: &Connection, slot: &SlotRow) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO slots (row_number, id, date, time, extra, status, patient_label, phone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            slot.row_number,
            slot.id,
            slot.date,
            slot.time,
            slot.extra,
            slot.status.as_str(),
            slot.patient_label,
            slot.phone,
        ],
    )?;
    Ok(())
}
