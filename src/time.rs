/**
 * sessionprep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::error::LineError;
use crate::types::Timestamp;

/// Time features appended to every event in the split files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeContext {
    pub hour: u32,
    /// 0 is Monday, 6 is Sunday.
    pub weekday: u32,
    /// Two periods per month, 1 to 24.
    pub half_month: u32,
}

impl TimeContext {

    pub fn from_timestamp(timestamp: Timestamp) -> Option<TimeContext> {
        let date_time = to_utc(timestamp)?;
        let date = date_time.date_naive();
        let month = date.month();

        let half_month = if 2 * date.day() < days_in_month(date.year(), month)? {
            month * 2 - 1
        } else {
            month * 2
        };

        Some(TimeContext {
            hour: date_time.hour(),
            weekday: date.weekday().num_days_from_monday(),
            half_month,
        })
    }
}

pub fn to_utc(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(timestamp, 0).single()
}

pub fn year_of(timestamp: Timestamp) -> Option<i32> {
    to_utc(timestamp).map(|date_time| date_time.year())
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Converts a formatted date into UTC epoch seconds. A literal `Z` is read as `GMT` so that
/// ISO-8601 values match a `%Z` in the format.
pub fn parse_timestamp(value: &str, format: &str) -> Result<Timestamp, LineError> {
    let value = value.trim().replace('Z', "GMT");

    if let Ok(with_offset) = DateTime::parse_from_str(&value, format) {
        return Ok(with_offset.timestamp());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(&value, format) {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }

    NaiveDate::parse_from_str(&value, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
        .ok_or_else(|| LineError::InvalidTimestamp {
            value: value.clone(),
            format: format.to_owned(),
        })
}

/// Reads a raw epoch value, fractional seconds are floored.
pub fn parse_raw_timestamp(value: &str) -> Result<Timestamp, LineError> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<Timestamp>() {
        return Ok(seconds);
    }

    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() => Ok(seconds.floor() as Timestamp),
        _ => Err(LineError::InvalidTimestamp { value: value.to_owned(), format: String::new() }),
    }
}
