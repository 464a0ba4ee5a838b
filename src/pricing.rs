// Trip pricing: hourly billing under a day, daily rate plus leftover hours above.
//
// `quote` is total. Zero and negative windows run through the same arithmetic
// and produce a label and a price; callers check `TripWindow::is_valid` before
// using a quote for a booking.

use crate::models::{PriceQuote, RateCard, TripWindow};

const HOURS_PER_DAY: f64 = 24.0;

pub fn quote(window: &TripWindow, rates: &RateCard) -> PriceQuote {
    let per_hour = finite_or_zero(rates.per_hour);
    let per_day = finite_or_zero(rates.per_day);
    let duration_hours = window.duration_hours();

    if duration_hours < HOURS_PER_DAY {
        let hours = duration_hours.ceil() as i64;
        return PriceQuote {
            duration_label: count_label(hours, "hour"),
            total_price: hours as f64 * per_hour,
            full_days: 0,
            hours,
        };
    }

    let full_days = (duration_hours / HOURS_PER_DAY).floor() as i64;
    let remaining_hours = (duration_hours - full_days as f64 * HOURS_PER_DAY).ceil() as i64;

    let mut duration_label = count_label(full_days, "day");
    if remaining_hours != 0 {
        duration_label.push_str(" and ");
        duration_label.push_str(&count_label(remaining_hours, "hour"));
    }

    PriceQuote {
        duration_label,
        total_price: full_days as f64 * per_day + remaining_hours as f64 * per_hour,
        full_days,
        hours: remaining_hours,
    }
}

/// "1 hour", "3 hours", "0 hours"
pub fn count_label(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
