//! Calendar-date windows used to filter date-stamped records.
//!
//! A window arrives as two calendar dates with no time of day. It is
//! normalized to `[start_of_day(start), end_of_day(end)]` in UTC, inclusive.
//! When both ends fall on the same day the filter is the explicit
//! [`WindowFilter::Day`] predicate rather than a collapsed range.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Short month labels used by chart series.
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// First instant of a UTC calendar day.
pub fn start_of_day(day: NaiveDate) -> Timestamp {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Last representable instant of a UTC calendar day (microsecond precision,
/// matching PostgreSQL `timestamptz`).
pub fn end_of_day(day: NaiveDate) -> Timestamp {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(last))
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Parse a `YYYY-MM-DD` date. A full RFC 3339 timestamp is also accepted and
/// reduced to its UTC calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| CoreError::Validation(format!("Invalid date '{raw}'. Expected YYYY-MM-DD")))
}

// ---------------------------------------------------------------------------
// DateWindow
// ---------------------------------------------------------------------------

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, rejecting a start that falls after the end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "Window start {start} is after window end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A window covering exactly one day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// The calendar month containing `day`.
    pub fn month_of(day: NaiveDate) -> Self {
        MonthKey::of(day).window()
    }

    /// The calendar month containing `now`.
    pub fn current_month(now: Timestamp) -> Self {
        Self::month_of(now.date_naive())
    }

    /// Build an optional window from raw `start` / `end` query values.
    ///
    /// Both absent means "all time". Supplying only one end is rejected so a
    /// half-specified window never silently widens to all time.
    pub fn from_query(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>, CoreError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(parse_date(start)?, parse_date(end)?).map(Some),
            _ => Err(CoreError::Validation(
                "Both start and end dates are required for a date window".to_string(),
            )),
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Normalized inclusive UTC bounds.
    pub fn bounds(&self) -> (Timestamp, Timestamp) {
        (start_of_day(self.start), end_of_day(self.end))
    }

    /// The predicate this window applies to a date column.
    pub fn filter(&self) -> WindowFilter {
        if self.is_single_day() {
            WindowFilter::Day(self.start)
        } else {
            let (from, to) = self.bounds();
            WindowFilter::Range { from, to }
        }
    }
}

// ---------------------------------------------------------------------------
// WindowFilter
// ---------------------------------------------------------------------------

/// A resolved date predicate.
///
/// Repositories bind the three optional values from [`WindowFilter::binds`]
/// into a fixed SQL fragment, so all three shapes share one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFilter {
    /// No date restriction.
    All,
    /// Records whose UTC calendar date equals the day.
    Day(NaiveDate),
    /// Records within the inclusive instant range.
    Range { from: Timestamp, to: Timestamp },
}

impl WindowFilter {
    pub fn for_window(window: Option<&DateWindow>) -> Self {
        window.map_or(WindowFilter::All, DateWindow::filter)
    }

    /// `(range_from, range_to, day)` bind values.
    pub fn binds(&self) -> (Option<Timestamp>, Option<Timestamp>, Option<NaiveDate>) {
        match *self {
            WindowFilter::All => (None, None, None),
            WindowFilter::Day(day) => (None, None, Some(day)),
            WindowFilter::Range { from, to } => (Some(from), Some(to), None),
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        match *self {
            WindowFilter::All => true,
            WindowFilter::Day(day) => ts.date_naive() == day,
            WindowFilter::Range { from, to } => from <= ts && ts <= to,
        }
    }
}

// ---------------------------------------------------------------------------
// Months
// ---------------------------------------------------------------------------

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    /// Short display label, e.g. `"Jan"`.
    pub fn label(&self) -> &'static str {
        MONTH_LABELS[(self.month.clamp(1, 12) - 1) as usize]
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, days_in_month(self.year, self.month))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.first_day(),
            end: self.last_day(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }
}

/// The `count` calendar months ending with the month of `today`, oldest first.
pub fn trailing_months(today: NaiveDate, count: usize) -> Vec<MonthKey> {
    let mut months = Vec::with_capacity(count);
    let mut month = MonthKey::of(today);
    for _ in 0..count {
        months.push(month);
        month = month.previous();
    }
    months.reverse();
    months
}
