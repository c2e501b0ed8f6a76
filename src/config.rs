use std::env;

#[derive(Clone, Debug, PartialEq)]
pub enum SlotBackend {
    Sqlite,
    Sheets,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub clinic_name: String,
    pub info_path: String,
    pub session_ttl_minutes: i64,
    pub slot_backend: SlotBackend,
    pub sheets_spreadsheet_id: String,
    pub sheets_sheet_name: String,
    pub google_access_token: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "turnero.db".to_string()),
            clinic_name: env::var("CLINIC_NAME").unwrap_or_else(|_| "nuestra clínica".to_string()),
            info_path: env::var("INFO_PATH").unwrap_or_else(|_| "info.txt".to_string()),
            session_ttl_minutes: env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1440),
            slot_backend: match env::var("SLOT_STORE").unwrap_or_default().as_str() {
                "sheets" => SlotBackend::Sheets,
                _ => SlotBackend::Sqlite,
            },
            sheets_spreadsheet_id: env::var("SHEETS_SPREADSHEET_ID").unwrap_or_default(),
            sheets_sheet_name: env::var("SHEETS_SHEET_NAME")
                .unwrap_or_else(|_| "Sheet1".to_string()),
            google_access_token: env::var("GOOGLE_ACCESS_TOKEN").unwrap_or_default(),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
        }
    }
}
