use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::messaging::MessagingProvider;
use crate::services::reservation::ReservationDesk;
use crate::services::slots::SlotStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub slots: Box<dyn SlotStore>,
    pub reservations: ReservationDesk,
    pub messaging: Box<dyn MessagingProvider>,
}
