//! Owner alert model.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;
use fleetledger_core::alert::{AlertDateBounds, AlertSort, RollForwardStep};
use fleetledger_core::types::{DbId, Timestamp};

/// A row from the `alerts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub alert_date: Timestamp,
    pub alert_type: String,
    pub priority: String,
    pub is_read: bool,
    pub is_active: bool,
    pub truck_id: Option<DbId>,
    pub driver_id: Option<DbId>,
    pub is_recurring: bool,
    pub recurring_type: String,
    pub recurring_day_of_month: Option<i32>,
    pub last_recurred_date: Option<Timestamp>,
    pub parent_alert_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An alert joined with the labels of the truck and driver it mentions.
///
/// The labels are `None` whenever the referenced row does not exist.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertWithRefs {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub alert: Alert,
    pub truck_number: Option<String>,
    pub driver_name: Option<String>,
}

/// Request body for creating an alert.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAlert {
    pub user_id: DbId,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub alert_date: Timestamp,
    pub alert_type: String,
    pub priority: String,
    pub truck_id: Option<DbId>,
    pub driver_id: Option<DbId>,
    pub is_recurring: Option<bool>,
    pub recurring_type: Option<String>,
    pub recurring_day_of_month: Option<i32>,
}

/// Request body for editing an alert. Absent fields keep their value.
///
/// `description`, `truck_id` and `driver_id` use `Option<Option<T>>` so an
/// explicit `null` clears the stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAlert {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 500))]
    pub description: Option<Option<String>>,
    pub alert_date: Option<Timestamp>,
    pub alert_type: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub truck_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "present")]
    pub driver_id: Option<Option<DbId>>,
    pub is_recurring: Option<bool>,
    pub recurring_type: Option<String>,
    pub recurring_day_of_month: Option<i32>,
}

/// Wraps a present key in `Some`, keeping `null` distinct from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for `PATCH /alerts/{id}/read`. Defaults to marking read.
#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    pub is_read: Option<bool>,
}

/// A fully validated alert ready to insert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub alert_date: Timestamp,
    pub alert_type: String,
    pub priority: String,
    pub truck_id: Option<DbId>,
    pub driver_id: Option<DbId>,
    pub is_recurring: bool,
    pub recurring_type: String,
    pub recurring_day_of_month: Option<i32>,
}

/// A fully validated edit. Every field is written as given.
#[derive(Debug, Clone)]
pub struct AlertChanges {
    pub title: String,
    pub description: Option<String>,
    pub alert_date: Timestamp,
    pub alert_type: String,
    pub priority: String,
    pub truck_id: Option<DbId>,
    pub driver_id: Option<DbId>,
    pub is_recurring: bool,
    pub recurring_type: String,
    pub recurring_day_of_month: Option<i32>,
}

/// Resolved listing filter for one owner's active alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertListFilter {
    pub user_id: DbId,
    pub is_read: Option<bool>,
    pub alert_type: Option<String>,
    pub priority: Option<String>,
    pub bounds: AlertDateBounds,
    pub sort: AlertSort,
    pub limit: i64,
    pub offset: i64,
}

/// Result of a recurring roll-forward.
#[derive(Debug, Clone, Serialize)]
pub struct RollForwardOutcome {
    /// The occurrence that was marked done.
    pub closed: Alert,
    /// Its successor, whether created now or by an earlier call.
    pub successor: Option<Alert>,
    #[serde(skip)]
    pub step: RollForwardStep,
}

/// Per-owner counter row.
#[derive(Debug, Clone, FromRow)]
pub struct AlertCountsRow {
    pub total: i64,
    pub unread: i64,
    pub overdue: i64,
    pub due_today: i64,
}

/// A `(key, count)` breakdown row.
#[derive(Debug, Clone, FromRow)]
pub struct KeyCountRow {
    pub key: String,
    pub count: i64,
}
