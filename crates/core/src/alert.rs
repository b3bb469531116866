//! Alert lifecycle rules.
//!
//! Enumerations, recurrence validation, the monthly roll-forward date rule,
//! listing filters and sort orders for owner alerts. Everything here is pure;
//! the repository executes what these functions decide.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::window::{days_in_month, start_of_day, MonthKey};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of upcoming alerts included in an owner summary.
pub const UPCOMING_SUMMARY_LIMIT: i64 = 5;

/// Display value for a referenced truck or driver that no longer exists.
pub const UNKNOWN_REFERENCE: &str = "Unknown";

/// SQL expression ranking `priority` so that `DESC` puts urgent first.
pub const PRIORITY_RANK_SQL: &str =
    "CASE priority WHEN 'urgent' THEN 4 WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Maintenance,
    Delivery,
    License,
    Insurance,
    Inspection,
    Fuel,
    Payment,
    Other,
}

impl AlertType {
    pub const ALL: [AlertType; 8] = [
        AlertType::Maintenance,
        AlertType::Delivery,
        AlertType::License,
        AlertType::Insurance,
        AlertType::Inspection,
        AlertType::Fuel,
        AlertType::Payment,
        AlertType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Maintenance => "maintenance",
            AlertType::Delivery => "delivery",
            AlertType::License => "license",
            AlertType::Insurance => "insurance",
            AlertType::Inspection => "inspection",
            AlertType::Fuel => "fuel",
            AlertType::Payment => "payment",
            AlertType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| invalid_enum("alert type", value, &Self::ALL.map(|t| t.as_str())))
    }
}

/// How urgently an alert needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    pub const ALL: [AlertPriority; 4] = [
        AlertPriority::Low,
        AlertPriority::Medium,
        AlertPriority::High,
        AlertPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Urgent => "urgent",
        }
    }

    /// Numeric rank, matching [`PRIORITY_RANK_SQL`].
    pub fn rank(&self) -> i32 {
        match self {
            AlertPriority::Low => 1,
            AlertPriority::Medium => 2,
            AlertPriority::High => 3,
            AlertPriority::Urgent => 4,
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| invalid_enum("priority", value, &Self::ALL.map(|p| p.as_str())))
    }
}

/// Recurrence cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringType {
    None,
    Monthly,
}

impl RecurringType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringType::None => "none",
            RecurringType::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "none" => Ok(RecurringType::None),
            "monthly" => Ok(RecurringType::Monthly),
            other => Err(invalid_enum("recurring type", other, &["none", "monthly"])),
        }
    }
}

fn invalid_enum(what: &str, value: &str, allowed: &[&str]) -> CoreError {
    CoreError::Validation(format!(
        "Invalid {what} '{value}'. Must be one of: {}",
        allowed.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// A validated recurrence configuration, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub is_recurring: bool,
    pub recurring_type: RecurringType,
    pub day_of_month: Option<i32>,
}

impl Recurrence {
    pub const NONE: Recurrence = Recurrence {
        is_recurring: false,
        recurring_type: RecurringType::None,
        day_of_month: None,
    };
}

/// Validate a requested recurrence.
///
/// A recurring alert is always monthly and needs a day in `1..=31`. When the
/// type is omitted on a recurring alert it defaults to monthly. A
/// non-recurring alert drops any day it was given.
pub fn resolve_recurrence(
    is_recurring: bool,
    recurring_type: Option<&str>,
    day_of_month: Option<i32>,
) -> Result<Recurrence, CoreError> {
    let recurring_type = recurring_type.map(RecurringType::parse).transpose()?;

    if !is_recurring {
        if recurring_type == Some(RecurringType::Monthly) {
            return Err(CoreError::Validation(
                "recurring_type 'monthly' requires is_recurring to be true".to_string(),
            ));
        }
        return Ok(Recurrence::NONE);
    }

    if recurring_type == Some(RecurringType::None) {
        return Err(CoreError::Validation(
            "A recurring alert must use recurring_type 'monthly'".to_string(),
        ));
    }

    match day_of_month {
        Some(day) if (1..=31).contains(&day) => Ok(Recurrence {
            is_recurring: true,
            recurring_type: RecurringType::Monthly,
            day_of_month: Some(day),
        }),
        Some(day) => Err(CoreError::Validation(format!(
            "recurring_day_of_month must be between 1 and 31, got {day}"
        ))),
        None => Err(CoreError::Validation(
            "recurring_day_of_month is required for recurring alerts".to_string(),
        )),
    }
}

/// Advance `alert_date` by one calendar month.
///
/// The day becomes `day_of_month`, clamped to the length of the target month,
/// and the time of day is kept. A day-31 alert on Jan 31 lands on Feb 28 (or
/// 29), then on Mar 31.
pub fn next_occurrence(alert_date: Timestamp, day_of_month: u32) -> Timestamp {
    let target = MonthKey::of(alert_date.date_naive()).next();
    let day = day_of_month
        .clamp(1, 31)
        .min(days_in_month(target.year, target.month));
    let date = NaiveDate::from_ymd_opt(target.year, target.month, day).unwrap_or(target.first_day());
    Utc.from_utc_datetime(&date.and_time(alert_date.time()))
}

/// What a `mark recurring done` call must still do for an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollForwardStep {
    /// Close the pending occurrence and create its successor.
    CloseAndSpawn,
    /// The occurrence was closed but its successor is missing; create it.
    SpawnSuccessor,
    /// A successor exists but the occurrence was left open; close it.
    CloseOnly,
    /// Already rolled forward.
    Noop,
}

/// Decide the roll-forward step for an occurrence.
///
/// Makes the operation repeatable: any partially applied roll-forward is
/// completed and a completed one is left untouched, so at most one successor
/// ever exists.
pub fn plan_roll_forward(
    is_recurring: bool,
    recurring_type: &str,
    is_read: bool,
    has_successor: bool,
) -> Result<RollForwardStep, CoreError> {
    if !is_recurring {
        return Err(CoreError::InvalidState(
            "Alert is not recurring and cannot be marked as recurring-done".to_string(),
        ));
    }
    if RecurringType::parse(recurring_type)? != RecurringType::Monthly {
        return Err(CoreError::InvalidState(format!(
            "Alert recurrence '{recurring_type}' does not support roll-forward"
        )));
    }

    Ok(match (is_read, has_successor) {
        (false, false) => RollForwardStep::CloseAndSpawn,
        (true, false) => RollForwardStep::SpawnSuccessor,
        (false, true) => RollForwardStep::CloseOnly,
        (true, true) => RollForwardStep::Noop,
    })
}

/// An alert is overdue when its date has passed and nobody has read it.
pub fn is_overdue(alert_date: Timestamp, is_read: bool, now: Timestamp) -> bool {
    alert_date < now && !is_read
}

/// Reject edits that move an alert into the past.
pub fn validate_future_date(alert_date: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if alert_date < now {
        return Err(CoreError::Validation(
            "alert_date cannot be moved into the past".to_string(),
        ));
    }
    Ok(())
}

/// Display label for an optional reference: the resolved label, `"Unknown"`
/// when a reference exists but could not be resolved, `None` when there is no
/// reference at all.
pub fn reference_label(has_reference: bool, resolved: Option<String>) -> Option<String> {
    match (has_reference, resolved) {
        (_, Some(label)) => Some(label),
        (true, None) => Some(UNKNOWN_REFERENCE.to_string()),
        (false, None) => None,
    }
}

// ---------------------------------------------------------------------------
// Listing filters
// ---------------------------------------------------------------------------

/// Named date filters for alert listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Overdue,
    Today,
    Upcoming,
    Week,
}

impl DateFilter {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "overdue" => Ok(DateFilter::Overdue),
            "today" => Ok(DateFilter::Today),
            "upcoming" => Ok(DateFilter::Upcoming),
            "week" => Ok(DateFilter::Week),
            other => Err(invalid_enum(
                "date filter",
                other,
                &["overdue", "today", "upcoming", "week"],
            )),
        }
    }

    /// Resolve the filter against the current instant.
    pub fn bounds(&self, now: Timestamp) -> AlertDateBounds {
        match self {
            DateFilter::Overdue => AlertDateBounds {
                before: Some(now),
                unread_only: true,
                ..AlertDateBounds::default()
            },
            DateFilter::Today => {
                let start = start_of_day(now.date_naive());
                AlertDateBounds {
                    from: Some(start),
                    before: Some(start + Duration::days(1)),
                    ..AlertDateBounds::default()
                }
            }
            DateFilter::Upcoming => AlertDateBounds {
                from: Some(now),
                ..AlertDateBounds::default()
            },
            DateFilter::Week => AlertDateBounds {
                from: Some(now),
                until: Some(now + Duration::days(7)),
                ..AlertDateBounds::default()
            },
        }
    }
}

/// `alert_date` bounds for a listing query.
///
/// `from` and `until` are inclusive, `before` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertDateBounds {
    pub from: Option<Timestamp>,
    pub before: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub unread_only: bool,
}

impl AlertDateBounds {
    pub fn contains(&self, alert_date: Timestamp, is_read: bool) -> bool {
        self.from.map_or(true, |from| alert_date >= from)
            && self.before.map_or(true, |before| alert_date < before)
            && self.until.map_or(true, |until| alert_date <= until)
            && !(self.unread_only && is_read)
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sortable alert fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    AlertDate,
    CreatedAt,
    UpdatedAt,
    Priority,
    Title,
    AlertType,
}

impl SortField {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "alert_date" | "alertDate" => Ok(SortField::AlertDate),
            "created_at" | "createdAt" => Ok(SortField::CreatedAt),
            "updated_at" | "updatedAt" => Ok(SortField::UpdatedAt),
            "priority" => Ok(SortField::Priority),
            "title" => Ok(SortField::Title),
            "alert_type" | "type" => Ok(SortField::AlertType),
            other => Err(invalid_enum(
                "sort field",
                other,
                &["alert_date", "created_at", "updated_at", "priority", "title", "alert_type"],
            )),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortField::AlertDate => "alert_date",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Priority => PRIORITY_RANK_SQL,
            SortField::Title => "title",
            SortField::AlertType => "alert_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(invalid_enum("sort order", other, &["asc", "desc"])),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A validated listing sort: primary key plus fixed tie-breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for AlertSort {
    fn default() -> Self {
        Self {
            field: SortField::AlertDate,
            order: SortOrder::Asc,
        }
    }
}

impl AlertSort {
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Result<Self, CoreError> {
        let default = Self::default();
        Ok(Self {
            field: sort_by.map(SortField::parse).transpose()?.unwrap_or(default.field),
            order: sort_order.map(SortOrder::parse).transpose()?.unwrap_or(default.order),
        })
    }

    /// `ORDER BY` body built only from whitelisted column expressions.
    ///
    /// Ties fall to priority (urgent first), then newest `created_at`, then
    /// id, skipping whichever of those is already the primary key.
    pub fn order_by_sql(&self) -> String {
        let mut terms = vec![format!("{} {}", self.field.sql(), self.order.sql())];
        if self.field != SortField::Priority {
            terms.push(format!("{PRIORITY_RANK_SQL} DESC"));
        }
        if self.field != SortField::CreatedAt {
            terms.push("created_at DESC".to_string());
        }
        terms.push("id DESC".to_string());
        terms.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Summary breakdowns
// ---------------------------------------------------------------------------

/// Aggregate counters for an owner's active alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: i64,
    pub unread: i64,
    pub overdue: i64,
    pub due_today: i64,
}

/// Turn `(key, count)` rows into a map holding every known key, missing keys
/// reported as zero.
pub fn zero_filled_breakdown<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    rows: impl IntoIterator<Item = (String, i64)>,
) -> BTreeMap<String, i64> {
    let mut breakdown: BTreeMap<String, i64> =
        keys.into_iter().map(|k| (k.to_string(), 0)).collect();
    for (key, count) in rows {
        *breakdown.entry(key).or_insert(0) += count;
    }
    breakdown
}
