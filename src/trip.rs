// Parsing and formatting of trip date/time strings passed between screens

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::TripWindow;

pub const INVALID_DATE: &str = "Invalid Date";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DISPLAY_FORMAT: &str = "%d %b %Y, %I:%M %p";

/// Combines a `YYYY-MM-DD` date with an `HH:MM` or `HH:MM:SS` time.
pub fn parse_instant(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(date.and_time(time))
}

impl TripWindow {
    pub fn from_parts(
        start_date: &str,
        start_time: &str,
        end_date: &str,
        end_time: &str,
    ) -> Option<TripWindow> {
        let start = parse_instant(start_date, start_time)?;
        let end = parse_instant(end_date, end_time)?;
        Some(TripWindow::new(start, end))
    }

    // Same as from_parts, for optional query parameters
    pub fn from_optional_parts(
        start_date: Option<&str>,
        start_time: Option<&str>,
        end_date: Option<&str>,
        end_time: Option<&str>,
    ) -> Option<TripWindow> {
        TripWindow::from_parts(start_date?, start_time?, end_date?, end_time?)
    }
}

pub fn query_date(instant: &NaiveDateTime) -> String {
    instant.format(DATE_FORMAT).to_string()
}

pub fn query_time(instant: &NaiveDateTime) -> String {
    instant.format(TIME_FORMAT).to_string()
}

/// Human-readable instant for the price bar, or the "Invalid Date" sentinel.
pub fn display_instant(instant: Option<NaiveDateTime>) -> String {
    match instant {
        Some(instant) => instant.format(DISPLAY_FORMAT).to_string(),
        None => INVALID_DATE.to_string(),
    }
}

pub fn display_optional(date: Option<&str>, time: Option<&str>) -> String {
    let instant = match (date, time) {
        (Some(date), Some(time)) => parse_instant(date, time),
        _ => None,
    };
    display_instant(instant)
}
