use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Offset, Utc};

use crate::error::ValidationError;

/// Offset used for every date key unless configured otherwise (UTC+5).
pub const DEFAULT_OFFSET_HOURS: i32 = 5;

/// Day-granularity calendar anchored to a single fixed UTC offset.
///
/// All date keys in the tracker are derived through one `Calendar`, so two
/// timestamps recorded on the same local day always produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        let offset =
            FixedOffset::east_opt(DEFAULT_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix());
        Calendar { offset }
    }
}

impl Calendar {
    /// Builds a calendar for a whole-hour offset in `-23..=23`.
    pub fn with_offset_hours(hours: i32) -> Result<Self, ValidationError> {
        if !(-23..=23).contains(&hours) {
            return Err(ValidationError::InvalidOffset(hours));
        }
        FixedOffset::east_opt(hours * 3600)
            .map(|offset| Calendar { offset })
            .ok_or(ValidationError::InvalidOffset(hours))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar date of `instant` in the reference offset.
    pub fn date_key(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.date_key(Utc::now())
    }

    /// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a date key.
    pub fn parse_moment(&self, s: &str) -> Result<NaiveDate, ValidationError> {
        let s = s.trim();
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(d);
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| self.date_key(dt.with_timezone(&Utc)))
            .map_err(|_| ValidationError::InvalidDate(s.to_string()))
    }
}

/// Adds calendar months, clamping the day to the end of a shorter month.
///
/// Jan 31 + 1 month is Feb 28 (Feb 29 in leap years).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Weekday index with 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Inclusive iterator over `[start, end]`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_local_day_maps_to_same_key() {
        let cal = Calendar::default();
        // 19:30 UTC is already the next day at +05:00
        let utc = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);
        let late = utc("2025-03-10T19:30:00Z");
        let early = utc("2025-03-11T02:00:00Z");
        assert_eq!(cal.date_key(late), date(2025, 3, 11));
        assert_eq!(cal.date_key(late), cal.date_key(early));
    }

    #[test]
    fn parse_moment_accepts_dates_and_timestamps() {
        let cal = Calendar::default();
        assert_eq!(cal.parse_moment("2025-12-01").unwrap(), date(2025, 12, 1));
        assert_eq!(cal.parse_moment("2025-11-30T20:00:00Z").unwrap(), date(2025, 12, 1));
        assert_eq!(cal.parse_moment("2025-12-01T23:00:00+05:00").unwrap(), date(2025, 12, 1));
        assert!(cal.parse_moment("next tuesday").is_err());
    }

    #[test]
    fn month_addition_clamps() {
        assert_eq!(add_months(date(2025, 1, 31), 1), date(2025, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(add_months(date(2025, 3, 15), 12), date(2026, 3, 15));
    }

    #[test]
    fn weekday_indices_start_on_sunday() {
        assert_eq!(weekday_index(date(2025, 6, 1)), 0); // Sunday
        assert_eq!(weekday_index(date(2025, 6, 2)), 1);
        assert_eq!(weekday_index(date(2025, 6, 7)), 6);
    }

    #[test]
    fn offset_out_of_range_is_rejected() {
        assert!(Calendar::with_offset_hours(24).is_err());
        assert_eq!(Calendar::with_offset_hours(0).unwrap().offset().local_minus_utc(), 0);
    }

    #[test]
    fn days_between_is_inclusive() {
        let days: Vec<_> = days_between(date(2025, 1, 30), date(2025, 2, 1)).collect();
        assert_eq!(days.len(), 3);
        assert_eq!(days_between(date(2025, 2, 1), date(2025, 1, 30)).count(), 0);
    }
}
