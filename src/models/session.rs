use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    Idle,
    AwaitingName,
    AwaitingPhone,
    AwaitingCoverage,
    MainMenu,
    AwaitingMonth,
    AwaitingDate,
    AwaitingTime,
}

impl DialogState {
    pub const ALL: [DialogState; 8] = [
        DialogState::Idle,
        DialogState::AwaitingName,
        DialogState::AwaitingPhone,
        DialogState::AwaitingCoverage,
        DialogState::MainMenu,
        DialogState::AwaitingMonth,
        DialogState::AwaitingDate,
        DialogState::AwaitingTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogState::Idle => "idle",
            DialogState::AwaitingName => "awaiting_name",
            DialogState::AwaitingPhone => "awaiting_phone",
            DialogState::AwaitingCoverage => "awaiting_coverage",
            DialogState::MainMenu => "main_menu",
            DialogState::AwaitingMonth => "awaiting_month",
            DialogState::AwaitingDate => "awaiting_date",
            DialogState::AwaitingTime => "awaiting_time",
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .unwrap_or(DialogState::Idle)
    }
}

/// Fields collected over the course of a conversation, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub coverage: String,
    #[serde(default)]
    pub data_complete: bool,
    #[serde(default)]
    pub in_main_menu: bool,
    #[serde(default)]
    pub selected_month: Option<u32>,
    #[serde(default)]
    pub selected_date: Option<String>,
    #[serde(default)]
    pub selected_time: Option<String>,
    #[serde(default)]
    pub available_months: Vec<u32>,
    #[serde(default)]
    pub slots_for_date: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: DialogState,
    pub data: SessionData,
    pub last_activity: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn new(id: &str, ttl_minutes: i64) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: id.to_string(),
            state: DialogState::Idle,
            data: SessionData::default(),
            last_activity: now,
            expires_at: now + Duration::minutes(ttl_minutes),
        }
    }

    pub fn touch(&mut self, ttl_minutes: i64) {
        let now = Utc::now().naive_utc();
        self.last_activity = now;
        self.expires_at = now + Duration::minutes(ttl_minutes);
    }

    pub fn patient_label(&self) -> String {
        format!("{} - {}", self.data.name, self.data.coverage)
    }

    /// Forget the patient's identity so the next booking starts a fresh intake.
    pub fn reset_intake(&mut self) {
        self.data.name.clear();
        self.data.phone.clear();
        self.data.coverage.clear();
        self.data.data_complete = false;
    }

    pub fn clear_selections(&mut self) {
        self.data.selected_month = None;
        self.data.selected_date = None;
        self.data.selected_time = None;
        self.data.available_months.clear();
        self.data.slots_for_date.clear();
    }
}
