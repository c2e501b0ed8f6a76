use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use turnero::config::{AppConfig, SlotBackend};
use turnero::db;
use turnero::services::messaging::twilio::TwilioSmsProvider;
use turnero::services::reservation::ReservationDesk;
use turnero::services::slots::{SheetsSlotStore, SlotStore, SqliteSlotStore};
use turnero::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    let slots: Box<dyn SlotStore> = match config.slot_backend {
        SlotBackend::Sheets => {
            anyhow::ensure!(
                !config.sheets_spreadsheet_id.is_empty(),
                "SHEETS_SPREADSHEET_ID must be set when SLOT_STORE=sheets"
            );
            anyhow::ensure!(
                !config.google_access_token.is_empty(),
                "GOOGLE_ACCESS_TOKEN must be set when SLOT_STORE=sheets"
            );
            tracing::info!(
                "using Google Sheets slot store (sheet: {})",
                config.sheets_sheet_name
            );
            Box::new(SheetsSlotStore::new(
                config.sheets_spreadsheet_id.clone(),
                config.sheets_sheet_name.clone(),
                config.google_access_token.clone(),
            ))
        }
        SlotBackend::Sqlite => {
            tracing::info!("using SQLite slot store ({})", config.database_url);
            Box::new(SqliteSlotStore::new(Arc::clone(&db)))
        }
    };

    if config.twilio_auth_token.is_empty() {
        tracing::warn!("TWILIO_AUTH_TOKEN not set, webhook signatures will not be checked");
    }

    let messaging = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
    );

    let addr = format!("0.0.0.0:{}", config.port);

    let state = Arc::new(AppState {
        db,
        config,
        slots,
        reservations: ReservationDesk::new(),
        messaging: Box::new(messaging),
    });

    let app = turnero::router(state);

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
