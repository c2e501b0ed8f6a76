//! The booking conversation as an explicit state machine.
//!
//! `Dialog::advance` maps `(state, input)` to the replies to send and the next
//! state. Steps that need the outside world (slot store, info file) return an
//! [`Effect`]; the conversation driver performs it and hands the result back
//! to the matching `*_listed` / `*_finished` method, which completes the
//! transition. Nothing in this module does I/O.

use chrono::NaiveDate;

use crate::models::{DialogState, Session, SlotRow};
use crate::services::availability::{dates_open, month_name, months_open, times_open};
use crate::services::reservation::{ReservationError, ReservationRequest};
use crate::services::slots::StoreError;

const MENU_KEYWORD: &str = "menu";

/// Where a keyword drops a session that has no pending question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    IntakeGate,
    Name,
    Phone,
    Coverage,
    MainMenu,
    Months,
}

/// Each keyword belongs to exactly one entry.
pub const KEYWORDS: &[(&str, Entry)] = &[
    (MENU_KEYWORD, Entry::IntakeGate),
    ("hola", Entry::Name),
    ("hi", Entry::Name),
    ("hello", Entry::Name),
    ("buenas", Entry::Name),
    ("turno", Entry::Name),
    ("quiero", Entry::Name),
    ("solicitar", Entry::Name),
    ("phone", Entry::Phone),
    ("social", Entry::Coverage),
    ("volver", Entry::MainMenu),
    ("turnos", Entry::Months),
];

fn lookup(word: &str) -> Option<Entry> {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| *keyword == word)
        .map(|(_, entry)| *entry)
}

/// Match the whole message first, then each word in order.
pub fn entry_for_message(message: &str) -> Option<Entry> {
    let lowered = message.trim().to_lowercase();
    lookup(&lowered).or_else(|| {
        lowered
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .find_map(lookup)
    })
}

/// States that expect a pick from a list rather than a personal detail, so
/// `menu` and `volver` still navigate from them.
fn accepts_navigation(state: DialogState) -> bool {
    matches!(
        state,
        DialogState::MainMenu
            | DialogState::AwaitingMonth
            | DialogState::AwaitingDate
            | DialogState::AwaitingTime
    )
}

pub fn is_valid_text(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.to_lowercase() != MENU_KEYWORD
}

pub fn is_numeric(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Rejects digits-only input, which is usually a phone number typed too early.
pub fn is_valid_name(input: &str) -> bool {
    is_valid_text(input) && !is_numeric(input)
}

// ── Replies ──

const MENU: &str = "🔸 Por favor selecciona una opción:\n\n1️⃣ Información 🏥\n2️⃣ Turnos 📆";
const MENU_SHORT: &str = "🔸 Selecciona una opción:\n1. Información sobre el lugar 🏥\n2. Reservas 📆";
const INTAKE_REQUIRED: &str =
    "❌ Antes de ver el menú necesitamos tus datos personales. Empecemos por ahí.";
const NAME_INVALID: &str = "❌ Datos incorrectos. Por favor, escribe tu nombre y apellido.";
const PHONE_PROMPT: &str =
    "📞 Escribe tu *número de teléfono* (característica sin 0 y número sin 15):";
const PHONE_INVALID: &str = "❌ El número debe contener solo dígitos. Inténtalo nuevamente.";
const PHONE_THANKS: &str = "📲 ¡Gracias por compartir tu número de teléfono!";
const COVERAGE_PROMPT: &str = "🔰 Por último, tu *obra social y plan de cobertura*:";
const COVERAGE_INVALID: &str = "❌ Datos incorrectos. Por favor, escribe tu obra social.";
const INTAKE_SAVED: &str = "✅ Datos personales guardados correctamente.";
const INVALID_OPTION: &str = "❌ Opción no válida. Responde *1* o *2*.";
const INFO_ERROR: &str = "❌ Hubo un problema al mostrar la información.";
const NO_MONTHS: &str = "😔 Por ahora no hay turnos cargados. Vuelve a consultar más adelante.";
const PICK_MONTH: &str = "➡️ Responde con el *NÚMERO* del mes que deseas reservar:";
const MONTH_OUT_OF_RANGE: &str = "❌ Opción no válida. Por favor, elige un número de la lista.";
const PICK_DATE: &str =
    "➡️ Escribe la fecha que deseas reservar (formato AAAA-MM-DD), o cópiala y pégala:";
const PICK_TIME: &str = "➡️ Escribe el horario que deseas reservar, o cópialo y pégalo:";
const TIME_INVALID: &str =
    "❌ El horario que ingresaste no es válido.\n🔄 Volviendo al menú principal.";
const SLOT_TAKEN: &str =
    "😔 Ese turno acaba de ser reservado por otra persona. Por favor, elige otro horario.";
const STORE_ERROR: &str =
    "❌ No pudimos consultar la agenda en este momento. Por favor, inténtalo de nuevo más tarde.";
const BOOKING_FAILED: &str =
    "❌ Hubo un error al reservar tu turno. Por favor, inténtalo de nuevo más tarde.";
const REENTER_NOTICE: &str =
    "🔄 Si deseas reservar otro turno, tendrás que ingresar tus datos nuevamente.";
const HINT: &str = "👋 Escribe *hola* para reservar un turno o *menu* para ver las opciones.";

/// Work the driver must perform before the transition can complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowInfo,
    ListMonths,
    ListDates { month: u32 },
    ListTimes { date: String },
    Reserve(ReservationRequest),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub replies: Vec<String>,
    pub effect: Option<Effect>,
}

impl Outcome {
    fn reply<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            effect: None,
        }
    }

    fn effect(effect: Effect) -> Self {
        Self {
            replies: Vec::new(),
            effect: Some(effect),
        }
    }

    fn then(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

pub struct Dialog<'a> {
    clinic_name: &'a str,
}

impl<'a> Dialog<'a> {
    pub fn new(clinic_name: &'a str) -> Self {
        Self { clinic_name }
    }

    fn welcome(&self) -> String {
        format!(
            "👋 ¡Bienvenido/a a *{}*! 🏥\n\nPara reservar un turno, escribe tu *nombre y apellido*:",
            self.clinic_name
        )
    }

    pub fn advance(&self, session: &mut Session, input: &str) -> Outcome {
        let text = input.trim();

        if accepts_navigation(session.state) {
            if let Some(entry @ (Entry::IntakeGate | Entry::MainMenu)) = entry_for_message(text) {
                return self.enter(session, entry);
            }
        }

        match session.state {
            DialogState::Idle => match entry_for_message(text) {
                Some(entry) => self.enter(session, entry),
                None => Outcome::reply([HINT]),
            },

            DialogState::AwaitingName => {
                if !is_valid_name(text) {
                    return Outcome::reply([NAME_INVALID]);
                }
                session.data.name = text.to_string();
                session.state = DialogState::AwaitingPhone;
                Outcome::reply([format!("Perfecto, *{text}*"), PHONE_PROMPT.to_string()])
            }

            DialogState::AwaitingPhone => {
                if !is_numeric(text) {
                    return Outcome::reply([PHONE_INVALID]);
                }
                session.data.phone = text.to_string();
                session.state = DialogState::AwaitingCoverage;
                Outcome::reply([PHONE_THANKS, COVERAGE_PROMPT])
            }

            DialogState::AwaitingCoverage => {
                if !is_valid_text(text) {
                    return Outcome::reply([COVERAGE_INVALID]);
                }
                session.data.coverage = text.to_string();
                self.finish_intake(session)
            }

            DialogState::MainMenu => match text {
                "1" => {
                    session.data.in_main_menu = true;
                    Outcome::effect(Effect::ShowInfo)
                }
                "2" => {
                    session.data.in_main_menu = false;
                    Outcome::effect(Effect::ListMonths)
                }
                _ => Outcome::reply([INVALID_OPTION]),
            },

            DialogState::AwaitingMonth => {
                let months = &session.data.available_months;
                let choice = text
                    .parse::<usize>()
                    .ok()
                    .filter(|n| (1..=months.len()).contains(n))
                    .map(|n| months[n - 1]);

                match choice {
                    Some(month) => {
                        session.data.selected_month = Some(month);
                        Outcome::effect(Effect::ListDates { month })
                    }
                    None => Outcome::reply([MONTH_OUT_OF_RANGE]).then(Effect::ListMonths),
                }
            }

            DialogState::AwaitingDate => {
                session.data.selected_date = Some(text.to_string());
                Outcome::effect(Effect::ListTimes {
                    date: text.to_string(),
                })
            }

            DialogState::AwaitingTime => {
                if !session.data.slots_for_date.iter().any(|t| t == text) {
                    session.clear_selections();
                    session.state = DialogState::MainMenu;
                    return Outcome::reply([TIME_INVALID, MENU]);
                }
                session.data.selected_time = Some(text.to_string());
                Outcome::effect(Effect::Reserve(ReservationRequest {
                    date: session.data.selected_date.clone().unwrap_or_default(),
                    time: text.to_string(),
                    patient_label: session.patient_label(),
                    phone: session.data.phone.clone(),
                }))
            }
        }
    }

    /// Intake only completes once every field is filled, since the keyword
    /// entries can skip straight to the phone or coverage captures.
    fn finish_intake(&self, session: &mut Session) -> Outcome {
        if session.data.name.is_empty() {
            session.state = DialogState::AwaitingName;
            return Outcome::reply([INTAKE_REQUIRED.to_string(), self.welcome()]);
        }
        if session.data.phone.is_empty() {
            session.state = DialogState::AwaitingPhone;
            return Outcome::reply([INTAKE_REQUIRED, PHONE_PROMPT]);
        }
        session.data.data_complete = true;
        session.state = DialogState::MainMenu;
        Outcome::reply([INTAKE_SAVED, MENU])
    }

    pub fn enter(&self, session: &mut Session, entry: Entry) -> Outcome {
        match entry {
            Entry::Name => {
                session.state = DialogState::AwaitingName;
                Outcome::reply([self.welcome()])
            }
            Entry::Phone => {
                session.state = DialogState::AwaitingPhone;
                Outcome::reply([PHONE_PROMPT])
            }
            Entry::Coverage => {
                session.state = DialogState::AwaitingCoverage;
                Outcome::reply([COVERAGE_PROMPT])
            }
            _ if !session.data.data_complete => {
                session.state = DialogState::AwaitingName;
                Outcome::reply([INTAKE_REQUIRED.to_string(), self.welcome()])
            }
            Entry::IntakeGate if session.data.in_main_menu => {
                session.clear_selections();
                session.state = DialogState::MainMenu;
                Outcome::reply([MENU_SHORT])
            }
            Entry::IntakeGate | Entry::MainMenu => {
                if entry == Entry::IntakeGate {
                    session.data.in_main_menu = true;
                }
                session.clear_selections();
                session.state = DialogState::MainMenu;
                Outcome::reply([MENU])
            }
            Entry::Months => Outcome::effect(Effect::ListMonths),
        }
    }

    fn back_to_menu(&self, session: &mut Session, message: impl Into<String>) -> Vec<String> {
        session.clear_selections();
        session.state = DialogState::MainMenu;
        vec![message.into(), MENU.to_string()]
    }

    pub fn info_shown(&self, session: &mut Session, content: Option<String>) -> Vec<String> {
        session.state = DialogState::MainMenu;
        match content {
            Some(content) => vec![content, MENU_SHORT.to_string()],
            None => vec![INFO_ERROR.to_string()],
        }
    }

    pub fn months_listed(
        &self,
        session: &mut Session,
        rows: Result<Vec<SlotRow>, StoreError>,
        today: NaiveDate,
    ) -> Vec<String> {
        let Ok(rows) = rows else {
            return self.back_to_menu(session, STORE_ERROR);
        };

        let months = months_open(&rows, today);
        if months.is_empty() {
            return self.back_to_menu(session, NO_MONTHS);
        }

        let listing = months
            .iter()
            .enumerate()
            .map(|(i, month)| format!("{}. {}", i + 1, capitalize(month_name(*month))))
            .collect::<Vec<_>>()
            .join("\n");

        session.data.available_months = months;
        session.state = DialogState::AwaitingMonth;
        vec![
            format!("✅ Meses con turnos disponibles:\n\n{listing}"),
            PICK_MONTH.to_string(),
        ]
    }

    pub fn dates_listed(
        &self,
        session: &mut Session,
        rows: Result<Vec<SlotRow>, StoreError>,
        today: NaiveDate,
        month: u32,
    ) -> Vec<String> {
        let Ok(rows) = rows else {
            return self.back_to_menu(session, STORE_ERROR);
        };

        let name = month_name(month);
        let dates = dates_open(&rows, today, month);
        if dates.is_empty() {
            return self.back_to_menu(session, format!("😔 No hay fechas disponibles para *{name}*."));
        }

        let listing = dates
            .iter()
            .map(|date| format!("📅 {date}"))
            .collect::<Vec<_>>()
            .join("\n");

        session.state = DialogState::AwaitingDate;
        vec![
            format!("✅ Fechas disponibles en *{name}*:\n\n{listing}"),
            PICK_DATE.to_string(),
        ]
    }

    pub fn times_listed(
        &self,
        session: &mut Session,
        rows: Result<Vec<SlotRow>, StoreError>,
        date: &str,
    ) -> Vec<String> {
        let Ok(rows) = rows else {
            return self.back_to_menu(session, STORE_ERROR);
        };

        let times = times_open(&rows, date);
        if times.is_empty() {
            return self.back_to_menu(
                session,
                format!("😔 *No hay turnos disponibles para la fecha {date}.*"),
            );
        }

        let listing = times
            .iter()
            .map(|time| format!("🕒 {time}"))
            .collect::<Vec<_>>()
            .join("\n");

        session.data.slots_for_date = times;
        session.state = DialogState::AwaitingTime;
        vec![
            format!("✅ Turnos disponibles para la fecha {date}:\n\n{listing}"),
            PICK_TIME.to_string(),
        ]
    }

    pub fn reservation_finished(
        &self,
        session: &mut Session,
        result: Result<SlotRow, ReservationError>,
    ) -> Vec<String> {
        match result {
            Ok(slot) => {
                let confirmation = format!(
                    "🛎️ *Turno reservado exitosamente* para *{}*.\n\n📅 Fecha: {}\n🕒 Horario: {}\n\n🤗 ¡Te esperamos!",
                    session.data.name,
                    slot.date.trim(),
                    slot.time.trim(),
                );
                session.reset_intake();
                session.clear_selections();
                session.state = DialogState::Idle;
                vec![confirmation, REENTER_NOTICE.to_string()]
            }
            Err(ReservationError::SlotTaken { .. }) => self.back_to_menu(session, SLOT_TAKEN),
            Err(ReservationError::Store(_)) => self.back_to_menu(session, BOOKING_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::SlotStatus;

    fn dialog() -> Dialog<'static> {
        Dialog::new("Clínica Test")
    }

    fn session_in(state: DialogState) -> Session {
        let mut session = Session::new("+5493871234567", 60);
        session.state = state;
        session
    }

    fn complete_session() -> Session {
        let mut session = session_in(DialogState::Idle);
        session.data.name = "Ana Gomez".to_string();
        session.data.phone = "3871234567".to_string();
        session.data.coverage = "OSDE".to_string();
        session.data.data_complete = true;
        session
    }

    fn rows() -> Vec<SlotRow> {
        [
            ["1", "2025-06-10", "09:00", "", "disponible"],
            ["2", "2025-06-10", "09:30", "", "reservado"],
            ["3", "2025-07-01", "10:00", "", "disponible"],
        ]
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let cells: Vec<String> = cells.iter().map(|s| s.to_string()).collect();
            SlotRow::from_cells(i as u32 + 2, &cells)
        })
        .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_keywords_are_claimed_once() {
        let mut seen = HashSet::new();
        for (keyword, _) in KEYWORDS {
            assert!(seen.insert(*keyword), "duplicate keyword {keyword}");
        }
    }

    #[test]
    fn test_entry_for_message() {
        assert_eq!(entry_for_message("MENU"), Some(Entry::IntakeGate));
        assert_eq!(entry_for_message("  Hola! "), Some(Entry::Name));
        assert_eq!(entry_for_message("quiero un turno"), Some(Entry::Name));
        assert_eq!(entry_for_message("ver turnos"), Some(Entry::Months));
        assert_eq!(entry_for_message("volver"), Some(Entry::MainMenu));
        assert_eq!(entry_for_message("gracias"), None);
    }

    #[test]
    fn test_name_validation() {
        assert!(!is_valid_name("12345"));
        assert!(!is_valid_name("menu"));
        assert!(!is_valid_name(" Menu "));
        assert!(!is_valid_name("   "));
        assert!(is_valid_name("Ana Gomez"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(!is_numeric("381-abc"));
        assert!(!is_numeric("+5493815551234"));
        assert!(!is_numeric(""));
        assert!(is_numeric("3815551234"));
        assert!(is_numeric(" 3815551234 "));
    }

    #[test]
    fn test_idle_without_keyword_hints() {
        let mut session = session_in(DialogState::Idle);
        let outcome = dialog().advance(&mut session, "buen día");
        assert_eq!(outcome.replies, vec![HINT]);
        assert_eq!(session.state, DialogState::Idle);
    }

    #[test]
    fn test_pending_capture_ignores_keywords() {
        let mut session = session_in(DialogState::AwaitingPhone);
        let outcome = dialog().advance(&mut session, "menu");
        assert_eq!(outcome.replies, vec![PHONE_INVALID]);
        assert_eq!(session.state, DialogState::AwaitingPhone);
    }

    #[test]
    fn test_intake_sequence() {
        let d = dialog();
        let mut session = session_in(DialogState::Idle);

        d.advance(&mut session, "hola");
        assert_eq!(session.state, DialogState::AwaitingName);

        let outcome = d.advance(&mut session, "12345");
        assert_eq!(outcome.replies, vec![NAME_INVALID]);
        assert_eq!(session.data.name, "");

        d.advance(&mut session, "Ana Gomez");
        assert_eq!(session.state, DialogState::AwaitingPhone);

        d.advance(&mut session, "381-abc");
        assert_eq!(session.state, DialogState::AwaitingPhone);
        d.advance(&mut session, "3815551234");
        assert_eq!(session.state, DialogState::AwaitingCoverage);

        let outcome = d.advance(&mut session, "menu");
        assert_eq!(outcome.replies, vec![COVERAGE_INVALID]);
        assert!(!session.data.data_complete);

        d.advance(&mut session, "OSDE 210");
        assert_eq!(session.state, DialogState::MainMenu);
        assert!(session.data.data_complete);
        assert_eq!(session.data.phone, "3815551234");
        assert_eq!(session.data.coverage, "OSDE 210");
    }

    #[test]
    fn test_gate_redirects_incomplete_sessions() {
        let mut session = session_in(DialogState::Idle);
        let outcome = dialog().advance(&mut session, "menu");
        assert_eq!(session.state, DialogState::AwaitingName);
        assert_eq!(outcome.replies[0], INTAKE_REQUIRED);

        let mut session = session_in(DialogState::Idle);
        dialog().advance(&mut session, "turnos");
        assert_eq!(session.state, DialogState::AwaitingName);
    }

    fn run_intake(d: &Dialog<'_>, session: &mut Session) {
        for input in ["hola", "Ana Gomez", "3871234567", "OSDE"] {
            d.advance(session, input);
        }
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_gate_sets_menu_flag_then_reshows() {
        let d = dialog();
        let mut session = session_in(DialogState::Idle);
        run_intake(&d, &mut session);
        assert!(!session.data.in_main_menu);

        let first = d.advance(&mut session, "menu");
        assert_eq!(first.replies, vec![MENU]);
        assert!(session.data.in_main_menu);
        assert_eq!(session.state, DialogState::MainMenu);

        let second = d.advance(&mut session, "menu");
        assert_eq!(second.replies, vec![MENU_SHORT]);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_volver_from_main_menu() {
        let d = dialog();
        let mut session = session_in(DialogState::Idle);
        run_intake(&d, &mut session);

        let outcome = d.advance(&mut session, "volver");
        assert_eq!(outcome.replies, vec![MENU]);
        assert_eq!(session.state, DialogState::MainMenu);
        assert!(!session.data.in_main_menu);
    }

    #[test]
    fn test_menu_leaves_listing_and_clears_selections() {
        let d = dialog();
        let mut session = session_in(DialogState::Idle);
        run_intake(&d, &mut session);

        d.advance(&mut session, "2");
        d.months_listed(&mut session, Ok(rows()), today());
        assert_eq!(session.state, DialogState::AwaitingMonth);

        let outcome = d.advance(&mut session, "Menu");
        assert_eq!(outcome.effect, None);
        assert_eq!(outcome.replies, vec![MENU]);
        assert_eq!(session.state, DialogState::MainMenu);
        assert!(session.data.available_months.is_empty());

        session.state = DialogState::AwaitingTime;
        session.data.selected_date = Some("2025-06-10".to_string());
        session.data.slots_for_date = vec!["09:00".to_string()];
        let outcome = d.advance(&mut session, "volver");
        assert_eq!(outcome.effect, None);
        assert_eq!(session.state, DialogState::MainMenu);
        assert_eq!(session.data.selected_date, None);
    }

    #[test]
    fn test_phone_keyword_cannot_skip_name() {
        let d = dialog();
        let mut session = session_in(DialogState::Idle);

        d.advance(&mut session, "phone");
        assert_eq!(session.state, DialogState::AwaitingPhone);
        d.advance(&mut session, "3871234567");
        let outcome = d.advance(&mut session, "OSDE");

        assert!(!session.data.data_complete);
        assert_eq!(session.state, DialogState::AwaitingName);
        assert_eq!(outcome.replies[0], INTAKE_REQUIRED);

        d.advance(&mut session, "Ana Gomez");
        d.advance(&mut session, "3871234567");
        d.advance(&mut session, "OSDE");
        assert!(session.data.data_complete);
        assert_eq!(session.patient_label(), "Ana Gomez - OSDE");
    }

    #[test]
    fn test_social_keyword_after_booking_cannot_complete_intake() {
        let d = dialog();
        let mut session = complete_session();
        session.reset_intake();

        d.advance(&mut session, "social");
        assert_eq!(session.state, DialogState::AwaitingCoverage);
        d.advance(&mut session, "OSDE");
        assert!(!session.data.data_complete);
        assert_eq!(session.state, DialogState::AwaitingName);
        assert_eq!(session.data.coverage, "OSDE");
    }

    #[test]
    fn test_missing_phone_is_asked_before_menu() {
        let d = dialog();
        let mut session = session_in(DialogState::AwaitingCoverage);
        session.data.name = "Ana Gomez".to_string();

        let outcome = d.advance(&mut session, "OSDE");
        assert_eq!(outcome.replies, vec![INTAKE_REQUIRED, PHONE_PROMPT]);
        assert_eq!(session.state, DialogState::AwaitingPhone);
        assert!(!session.data.data_complete);
    }

    #[test]
    fn test_menu_flag_is_per_session() {
        let d = dialog();
        let mut a = complete_session();
        let mut b = complete_session();
        a.state = DialogState::MainMenu;
        b.state = DialogState::MainMenu;

        d.advance(&mut a, "1");
        d.advance(&mut b, "2");
        assert!(a.data.in_main_menu);
        assert!(!b.data.in_main_menu);
    }

    #[test]
    fn test_main_menu_options() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::MainMenu;

        assert_eq!(d.advance(&mut session, "1").effect, Some(Effect::ShowInfo));
        assert_eq!(d.advance(&mut session, "2").effect, Some(Effect::ListMonths));

        let outcome = d.advance(&mut session, "3");
        assert_eq!(outcome.replies, vec![INVALID_OPTION]);
        assert_eq!(outcome.effect, None);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_info_failure_stays_in_menu() {
        let mut session = complete_session();
        let replies = dialog().info_shown(&mut session, None);
        assert_eq!(replies, vec![INFO_ERROR]);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_month_listing_and_selection() {
        let d = dialog();
        let mut session = complete_session();

        let replies = d.months_listed(&mut session, Ok(rows()), today());
        assert_eq!(session.data.available_months, vec![6, 7]);
        assert!(replies[0].contains("1. Junio"));
        assert!(replies[0].contains("2. Julio"));
        assert_eq!(session.state, DialogState::AwaitingMonth);

        let outcome = d.advance(&mut session, "2");
        assert_eq!(outcome.effect, Some(Effect::ListDates { month: 7 }));
        assert_eq!(session.data.selected_month, Some(7));
    }

    #[test]
    fn test_month_out_of_range_restarts_listing() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::AwaitingMonth;
        session.data.available_months = vec![6];

        for input in ["0", "2", "junio", "-1"] {
            let outcome = d.advance(&mut session, input);
            assert_eq!(outcome.replies, vec![MONTH_OUT_OF_RANGE]);
            assert_eq!(outcome.effect, Some(Effect::ListMonths));
        }
        assert_eq!(session.data.selected_month, None);
    }

    #[test]
    fn test_no_months_returns_to_menu() {
        let mut session = complete_session();
        let replies = dialog().months_listed(&mut session, Ok(vec![]), today());
        assert_eq!(replies, vec![NO_MONTHS, MENU]);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_store_failure_returns_to_menu() {
        let mut session = complete_session();
        session.data.selected_month = Some(6);
        let err = StoreError::Status {
            status: 500,
            body: String::new(),
        };
        let replies = dialog().dates_listed(&mut session, Err(err), today(), 6);
        assert_eq!(replies, vec![STORE_ERROR, MENU]);
        assert_eq!(session.state, DialogState::MainMenu);
        assert_eq!(session.data.selected_month, None);
    }

    #[test]
    fn test_empty_dates_clear_selection() {
        let mut session = complete_session();
        session.data.selected_month = Some(9);
        let replies = dialog().dates_listed(&mut session, Ok(rows()), today(), 9);
        assert!(replies[0].contains("septiembre"));
        assert_eq!(session.data.selected_month, None);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_times_listed_snapshot_open_only() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::AwaitingDate;

        let outcome = d.advance(&mut session, " 2025-06-10 ");
        assert_eq!(
            outcome.effect,
            Some(Effect::ListTimes {
                date: "2025-06-10".to_string()
            })
        );

        let replies = d.times_listed(&mut session, Ok(rows()), "2025-06-10");
        assert_eq!(session.data.slots_for_date, vec!["09:00"]);
        assert!(replies[0].contains("🕒 09:00"));
        assert!(!replies[0].contains("09:30"));
        assert_eq!(session.state, DialogState::AwaitingTime);
    }

    #[test]
    fn test_time_outside_snapshot_goes_back_to_menu() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::AwaitingTime;
        session.data.selected_date = Some("2025-06-10".to_string());
        session.data.slots_for_date = vec!["09:00".to_string()];

        let outcome = d.advance(&mut session, "09:30");
        assert_eq!(outcome.replies, vec![TIME_INVALID, MENU]);
        assert_eq!(outcome.effect, None);
        assert_eq!(session.state, DialogState::MainMenu);
    }

    #[test]
    fn test_time_selection_requests_reservation() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::AwaitingTime;
        session.data.selected_date = Some("2025-06-10".to_string());
        session.data.slots_for_date = vec!["09:00".to_string()];

        let outcome = d.advance(&mut session, "09:00");
        assert_eq!(
            outcome.effect,
            Some(Effect::Reserve(ReservationRequest {
                date: "2025-06-10".to_string(),
                time: "09:00".to_string(),
                patient_label: "Ana Gomez - OSDE".to_string(),
                phone: "3871234567".to_string(),
            }))
        );
    }

    #[test]
    fn test_successful_reservation_resets_intake() {
        let d = dialog();
        let mut session = complete_session();
        session.state = DialogState::AwaitingTime;
        let mut slot = rows().remove(0);
        slot.status = SlotStatus::Reserved;

        let replies = d.reservation_finished(&mut session, Ok(slot));
        assert!(replies[0].contains("Ana Gomez"));
        assert!(replies[0].contains("2025-06-10"));
        assert_eq!(session.state, DialogState::Idle);
        assert!(!session.data.data_complete);
        assert_eq!(session.data.name, "");

        let outcome = d.advance(&mut session, "menu");
        assert_eq!(outcome.replies[0], INTAKE_REQUIRED);
        assert_eq!(session.state, DialogState::AwaitingName);
    }

    #[test]
    fn test_lost_race_recommends_retry() {
        let mut session = complete_session();
        session.state = DialogState::AwaitingTime;
        let replies = dialog().reservation_finished(
            &mut session,
            Err(ReservationError::SlotTaken {
                date: "2025-06-10".to_string(),
                time: "09:00".to_string(),
            }),
        );
        assert_eq!(replies, vec![SLOT_TAKEN, MENU]);
        assert_eq!(session.state, DialogState::MainMenu);
        assert!(session.data.data_complete);
    }
}
