//! Period selectors, the `[start, end]` window they describe, and the
//! "already happened" check. Everything here is UTC.

use crate::common::constants::ROLLING_WINDOW_DAYS;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Coarse time range a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// The calendar month containing "now"
    CurrentMonth,
    /// The calendar year containing "now"
    CurrentYear,
    /// `now .. now + 180 days`
    Rolling,
}

impl Period {
    /// `1` is the current month, `12` the current year; every other value,
    /// and no value at all, is the rolling window.
    pub fn from_months(months: Option<u32>) -> Self {
        match months {
            Some(1) => Period::CurrentMonth,
            Some(12) => Period::CurrentYear,
            _ => Period::Rolling,
        }
    }
}

/// Inclusive instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// An event is reported only when it starts inside the window and has not
    /// started yet, whatever period was requested.
    pub fn admits(&self, event_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.contains(event_start) && !is_past(event_start, now)
    }
}

pub fn window(period: Period, now: DateTime<Utc>) -> TimeWindow {
    match period {
        Period::CurrentMonth => {
            let start = utc_midnight(now.year(), now.month(), 1);
            let (next_year, next_month) = if now.month() == 12 {
                (now.year() + 1, 1)
            } else {
                (now.year(), now.month() + 1)
            };
            let end = utc_midnight(next_year, next_month, 1) - Duration::seconds(1);
            TimeWindow { start, end }
        }
        Period::CurrentYear => TimeWindow {
            start: utc_midnight(now.year(), 1, 1),
            end: utc_midnight(now.year() + 1, 1, 1) - Duration::seconds(1),
        },
        Period::Rolling => TimeWindow {
            start: now,
            end: now + Duration::days(ROLLING_WINDOW_DAYS),
        },
    }
}

pub fn is_past(event_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    event_start < now
}

fn utc_midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    // Callers only pass the first day of a valid month.
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse the timestamp shapes the providers emit. Values without zone
/// information are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // Offsets without a colon, e.g. "2025-11-20T10:00:00+0300"
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
