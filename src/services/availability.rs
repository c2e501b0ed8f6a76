//! Derives what the patient can be offered from the raw slot rows.
//!
//! Months and dates list every slot that exists from today onwards, whatever
//! its status; times list only slots that are still open. Output order is
//! first-seen row order, since menus number their options positionally.

use chrono::{Datelike, NaiveDate};

use crate::models::SlotRow;

pub const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Spanish name of a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

fn push_unique<T: PartialEq>(out: &mut Vec<T>, value: T) {
    if !out.contains(&value) {
        out.push(value);
    }
}

fn upcoming(rows: &[SlotRow], today: NaiveDate) -> impl Iterator<Item = (&SlotRow, NaiveDate)> {
    rows.iter()
        .filter_map(|row| row.parsed_date().map(|date| (row, date)))
        .filter(move |(_, date)| *date >= today)
}

pub fn months_open(rows: &[SlotRow], today: NaiveDate) -> Vec<u32> {
    let mut months = Vec::new();
    for (_, date) in upcoming(rows, today) {
        push_unique(&mut months, date.month());
    }
    months
}

pub fn dates_open(rows: &[SlotRow], today: NaiveDate, month: u32) -> Vec<String> {
    let mut dates = Vec::new();
    for (row, date) in upcoming(rows, today) {
        if date.month() == month {
            push_unique(&mut dates, row.date.trim().to_string());
        }
    }
    dates
}

pub fn times_open(rows: &[SlotRow], date: &str) -> Vec<String> {
    let date = date.trim();
    rows.iter()
        .filter(|row| row.date.trim() == date && row.status.is_bookable())
        .map(|row| row.time.trim().to_string())
        .collect()
}
