use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

use super::TransformError;
use crate::entities::time;

/// Convert an epoch-milliseconds timestamp to a UTC calendar instant.
pub fn start_time(ts: i64) -> Result<NaiveDateTime, TransformError> {
    DateTime::from_timestamp_millis(ts)
        .map(|instant| instant.naive_utc())
        .ok_or(TransformError::InvalidTimestamp { ts })
}

/// Break a start time down into the time dimension's calendar columns.
pub fn time_row(start_time: NaiveDateTime) -> time::Model {
    time::Model {
        start_time,
        hour: start_time.hour() as i32,
        day: start_time.day() as i32,
        week: start_time.iso_week().week() as i32,
        month: start_time.month() as i32,
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday() as i32,
    }
}
