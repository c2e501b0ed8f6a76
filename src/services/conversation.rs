use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Local, NaiveDate};

use crate::db::queries;
use crate::models::Session;
use crate::services::dialog::{Dialog, Effect};
use crate::services::info::load_info;
use crate::state::AppState;

/// Run one inbound message through the session's dialog and return the
/// replies to send back, in order.
pub async fn process_message(
    state: &Arc<AppState>,
    session_id: &str,
    message: &str,
) -> anyhow::Result<Vec<String>> {
    process_message_on(state, session_id, message, Local::now().date_naive()).await
}

/// Same as [`process_message`] with an explicit "today" for availability.
pub async fn process_message_on(
    state: &Arc<AppState>,
    session_id: &str,
    message: &str,
    today: NaiveDate,
) -> anyhow::Result<Vec<String>> {
    let ttl = state.config.session_ttl_minutes;

    let mut session = {
        let db = state.db.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        queries::get_session(&db, session_id)?
    }
    .unwrap_or_else(|| Session::new(session_id, ttl));

    let from = session.state;
    let dialog = Dialog::new(&state.config.clinic_name);

    let outcome = dialog.advance(&mut session, message);
    let mut replies = outcome.replies;
    if let Some(effect) = outcome.effect {
        replies.extend(perform(state, &dialog, &mut session, effect, today).await);
    }

    session.touch(ttl);
    {
        let db = state.db.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        queries::save_session(&db, &session)?;
    }

    tracing::info!(
        session = session_id,
        from = from.as_str(),
        to = session.state.as_str(),
        "dialog step"
    );

    Ok(replies)
}

async fn perform(
    state: &AppState,
    dialog: &Dialog<'_>,
    session: &mut Session,
    effect: Effect,
    today: NaiveDate,
) -> Vec<String> {
    match effect {
        Effect::ShowInfo => {
            let content = load_info(&state.config.info_path).await;
            dialog.info_shown(session, content)
        }
        Effect::ListMonths => {
            let rows = state.slots.fetch_rows().await;
            if let Err(e) = &rows {
                tracing::error!(error = %e, session = %session.id, "failed to list months");
            }
            dialog.months_listed(session, rows, today)
        }
        Effect::ListDates { month } => {
            let rows = state.slots.fetch_rows().await;
            if let Err(e) = &rows {
                tracing::error!(error = %e, session = %session.id, month, "failed to list dates");
            }
            dialog.dates_listed(session, rows, today, month)
        }
        Effect::ListTimes { date } => {
            let rows = state.slots.fetch_rows().await;
            if let Err(e) = &rows {
                tracing::error!(error = %e, session = %session.id, date = %date, "failed to list times");
            }
            dialog.times_listed(session, rows, &date)
        }
        Effect::Reserve(request) => {
            let result = state
                .reservations
                .reserve(state.slots.as_ref(), &request)
                .await;
            if let Err(e) = &result {
                tracing::error!(error = %e, session = %session.id, "reservation failed");
            }
            dialog.reservation_finished(session, result)
        }
    }
}
