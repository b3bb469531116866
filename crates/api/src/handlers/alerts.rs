//! Handlers for owner alerts.
//!
//! Provides listing, CRUD, read-state toggles, soft delete / restore,
//! permanent delete, the owner summary, and the recurring roll-forward.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use fleetledger_core::alert::{
    is_overdue, reference_label, resolve_recurrence, validate_future_date, zero_filled_breakdown,
    AlertCounts, AlertPriority, AlertSort, AlertType, DateFilter,
};
use fleetledger_core::error::CoreError;
use fleetledger_core::metadata::{require_id, TotalsScope};
use fleetledger_core::pagination::{
    clamp_limit, clamp_page, page_offset, Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_db::models::alert::{
    Alert, AlertChanges, AlertListFilter, AlertWithRefs, CreateAlert, MarkReadRequest, NewAlert,
    UpdateAlert,
};
use fleetledger_db::repositories::{AlertRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::query::UserParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// An alert as returned over HTTP, with the derived overdue flag.
///
/// `truck_number` / `driver_name` are present on reads that resolve
/// references; a reference that no longer resolves shows as `"Unknown"`.
#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub is_overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
}

impl AlertView {
    fn plain(alert: Alert, now: Timestamp) -> Self {
        Self {
            is_overdue: is_overdue(alert.alert_date, alert.is_read, now),
            alert,
            truck_number: None,
            driver_name: None,
        }
    }

    fn with_refs(row: AlertWithRefs, now: Timestamp) -> Self {
        let truck_number = reference_label(row.alert.truck_id.is_some(), row.truck_number);
        let driver_name = reference_label(row.alert.driver_id.is_some(), row.driver_name);
        Self {
            truck_number,
            driver_name,
            ..Self::plain(row.alert, now)
        }
    }
}

/// Owner summary: counters, breakdowns, and the next few upcoming alerts.
#[derive(Debug, Serialize)]
pub struct AlertSummary {
    #[serde(flatten)]
    pub counts: AlertCounts,
    pub by_type: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub upcoming: Vec<AlertView>,
}

/// Result of marking a recurring alert done.
#[derive(Debug, Serialize)]
pub struct RollForwardView {
    pub closed: AlertView,
    pub successor: Option<AlertView>,
}

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for listing alerts.
#[derive(Debug, Deserialize)]
pub struct ListAlertsParams {
    pub user_id: Option<DbId>,
    pub is_read: Option<bool>,
    pub alert_type: Option<String>,
    pub priority: Option<String>,
    pub date_filter: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an alert id from the path. A malformed id is reported the same way
/// as an unknown one.
fn parse_alert_id(raw: &str) -> AppResult<DbId> {
    raw.trim()
        .parse::<DbId>()
        .map_err(|_| AppError::Core(alert_not_found(0)))
}

fn alert_not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "Alert", id }
}

fn require_user(user_id: Option<DbId>) -> AppResult<DbId> {
    Ok(require_id(user_id, TotalsScope::User)?)
}

/// Treat an empty or whitespace-only query value as absent.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be blank".to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// GET /alerts?user_id=&is_read=&alert_type=&priority=&date_filter=&page=&limit=&sort_by=&sort_order=
///
/// One page of an owner's active alerts.
pub async fn list_alerts(
    State(state): State<AppState>,
    params: Result<Query<ListAlertsParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;
    let now = Utc::now();

    let alert_type = non_empty(params.alert_type.as_deref())
        .map(AlertType::parse)
        .transpose()?;
    let priority = non_empty(params.priority.as_deref())
        .map(AlertPriority::parse)
        .transpose()?;
    let bounds = non_empty(params.date_filter.as_deref())
        .map(DateFilter::parse)
        .transpose()?
        .map(|f| f.bounds(now))
        .unwrap_or_default();
    let sort = AlertSort::parse(
        non_empty(params.sort_by.as_deref()),
        non_empty(params.sort_order.as_deref()),
    )?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);

    let filter = AlertListFilter {
        user_id,
        is_read: params.is_read,
        alert_type: alert_type.map(|t| t.as_str().to_string()),
        priority: priority.map(|p| p.as_str().to_string()),
        bounds,
        sort,
        limit,
        offset: page_offset(page, limit),
    };

    let (items, total) = tokio::try_join!(
        AlertRepo::list(&state.pool, &filter),
        AlertRepo::count(&state.pool, &filter),
    )?;

    let page = Page::new(items, total, page, limit).map(|row| AlertView::with_refs(row, now));
    Ok(Json(DataResponse { data: page }))
}

/// GET /alerts/summary?user_id=
///
/// Counters, per-type and per-priority breakdowns, and the next upcoming
/// unread alerts for an owner.
pub async fn alert_summary(
    State(state): State<AppState>,
    params: Result<Query<UserParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;
    let now = Utc::now();

    let (counts, by_type, by_priority, upcoming) = tokio::try_join!(
        AlertRepo::counts(&state.pool, user_id, now),
        AlertRepo::count_by_type(&state.pool, user_id),
        AlertRepo::count_by_priority(&state.pool, user_id),
        AlertRepo::upcoming(&state.pool, user_id, now),
    )?;

    let summary = AlertSummary {
        counts: AlertCounts {
            total: counts.total,
            unread: counts.unread,
            overdue: counts.overdue,
            due_today: counts.due_today,
        },
        by_type: zero_filled_breakdown(
            AlertType::ALL.iter().map(|t| t.as_str()),
            by_type.into_iter().map(|r| (r.key, r.count)),
        ),
        by_priority: zero_filled_breakdown(
            AlertPriority::ALL.iter().map(|p| p.as_str()),
            by_priority.into_iter().map(|r| (r.key, r.count)),
        ),
        upcoming: upcoming
            .into_iter()
            .map(|row| AlertView::with_refs(row, now))
            .collect(),
    };

    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /alerts
///
/// Create an unread, active alert.
pub async fn create_alert(
    State(state): State<AppState>,
    payload: Result<Json<CreateAlert>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate().map_err(CoreError::from)?;
    validate_title(&input.title)?;

    let alert_type = AlertType::parse(&input.alert_type)?;
    let priority = AlertPriority::parse(&input.priority)?;
    let recurrence = resolve_recurrence(
        input.is_recurring.unwrap_or(false),
        input.recurring_type.as_deref(),
        input.recurring_day_of_month,
    )?;

    UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        })?;

    let new_alert = NewAlert {
        user_id: input.user_id,
        title: input.title.trim().to_string(),
        description: input.description,
        alert_date: input.alert_date,
        alert_type: alert_type.as_str().to_string(),
        priority: priority.as_str().to_string(),
        truck_id: input.truck_id,
        driver_id: input.driver_id,
        is_recurring: recurrence.is_recurring,
        recurring_type: recurrence.recurring_type.as_str().to_string(),
        recurring_day_of_month: recurrence.day_of_month,
    };
    let alert = AlertRepo::create(&state.pool, &new_alert).await?;

    tracing::info!(
        alert_id = alert.id,
        user_id = alert.user_id,
        alert_type = %alert.alert_type,
        is_recurring = alert.is_recurring,
        "Alert created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: AlertView::plain(alert, Utc::now()),
        }),
    ))
}

/// GET /alerts/{id}
///
/// A single active alert with truck and driver labels resolved.
pub async fn get_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    let row = AlertRepo::find_with_refs(&state.pool, id)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    Ok(Json(DataResponse {
        data: AlertView::with_refs(row, Utc::now()),
    }))
}

/// PUT /alerts/{id}
///
/// Partial update. Absent fields keep their value and an explicit `null`
/// clears the description, truck or driver. Enum and recurrence rules are
/// checked against the merged alert.
pub async fn update_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateAlert>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    let Json(input) = payload?;
    input.validate().map_err(CoreError::from)?;
    let now = Utc::now();

    let existing = AlertRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    let changes = merge_changes(existing, input, now)?;
    let alert = AlertRepo::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    tracing::info!(alert_id = alert.id, user_id = alert.user_id, "Alert updated");

    Ok(Json(DataResponse {
        data: AlertView::plain(alert, now),
    }))
}

/// Merge an edit onto the stored alert and validate the result.
fn merge_changes(
    existing: Alert,
    input: UpdateAlert,
    now: Timestamp,
) -> Result<AlertChanges, CoreError> {
    let title = match input.title {
        Some(title) => {
            validate_title(&title)?;
            title.trim().to_string()
        }
        None => existing.title,
    };

    let alert_date = match input.alert_date {
        Some(date) if date != existing.alert_date => {
            validate_future_date(date, now)?;
            date
        }
        _ => existing.alert_date,
    };

    let alert_type = match input.alert_type.as_deref() {
        Some(value) => AlertType::parse(value)?.as_str().to_string(),
        None => existing.alert_type,
    };
    let priority = match input.priority.as_deref() {
        Some(value) => AlertPriority::parse(value)?.as_str().to_string(),
        None => existing.priority,
    };

    // An unchanged recurring flag keeps the stored type; flipping it lets
    // the type fall back to the default for the new flag.
    let is_recurring = input.is_recurring.unwrap_or(existing.is_recurring);
    let recurring_type = match input.recurring_type.as_deref() {
        Some(value) => Some(value),
        None if is_recurring == existing.is_recurring => Some(existing.recurring_type.as_str()),
        None => None,
    };
    let recurrence = resolve_recurrence(
        is_recurring,
        recurring_type,
        input.recurring_day_of_month.or(existing.recurring_day_of_month),
    )?;

    Ok(AlertChanges {
        title,
        description: input.description.unwrap_or(existing.description),
        alert_date,
        alert_type,
        priority,
        truck_id: input.truck_id.unwrap_or(existing.truck_id),
        driver_id: input.driver_id.unwrap_or(existing.driver_id),
        is_recurring: recurrence.is_recurring,
        recurring_type: recurrence.recurring_type.as_str().to_string(),
        recurring_day_of_month: recurrence.day_of_month,
    })
}

// ---------------------------------------------------------------------------
// Read state
// ---------------------------------------------------------------------------

/// PATCH /alerts/{id}/read
///
/// Set the read flag. An empty body marks the alert read. Reading a
/// recurring alert marks it done and creates its successor.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    let request: MarkReadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MarkReadRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| CoreError::Validation(format!("Invalid request body: {e}")))?
    };
    let is_read = request.is_read.unwrap_or(true);
    let now = Utc::now();

    let alert = AlertRepo::mark_read(&state.pool, id, is_read, now)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    tracing::info!(alert_id = alert.id, is_read, "Alert read state changed");

    Ok(Json(DataResponse {
        data: AlertView::plain(alert, now),
    }))
}

/// Response body for mark-all-read.
#[derive(Debug, Serialize)]
pub struct MarkAllReadResult {
    pub updated: u64,
}

/// PATCH /alerts/read-all?user_id=
///
/// Mark every active unread one-off alert of an owner as read. Recurring
/// alerts stay pending until marked done.
pub async fn mark_all_read(
    State(state): State<AppState>,
    params: Result<Query<UserParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let user_id = require_user(params.user_id)?;

    let updated = AlertRepo::mark_all_read(&state.pool, user_id).await?;

    tracing::info!(user_id, updated, "Alerts marked read");

    Ok(Json(DataResponse {
        data: MarkAllReadResult { updated },
    }))
}

/// POST /alerts/{id}/done
///
/// Close a recurring occurrence and create its successor. Repeating the call
/// returns the same pair without creating another successor.
pub async fn mark_recurring_done(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    let now = Utc::now();

    let outcome = AlertRepo::roll_forward(&state.pool, id, now)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    tracing::info!(
        alert_id = id,
        successor_id = outcome.successor.as_ref().map(|s| s.id),
        step = ?outcome.step,
        "Recurring alert marked done"
    );

    Ok(Json(DataResponse {
        data: RollForwardView {
            closed: AlertView::plain(outcome.closed, now),
            successor: outcome.successor.map(|s| AlertView::plain(s, now)),
        },
    }))
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Response body for a soft delete.
#[derive(Debug, Serialize)]
pub struct SoftDeleteResult {
    pub id: DbId,
    pub is_active: bool,
}

/// DELETE /alerts/{id}
///
/// Soft-delete an alert. It disappears from listings until restored.
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    if !AlertRepo::soft_delete(&state.pool, id).await? {
        return Err(alert_not_found(id).into());
    }

    tracing::info!(alert_id = id, "Alert soft-deleted");

    Ok(Json(DataResponse {
        data: SoftDeleteResult {
            id,
            is_active: false,
        },
    }))
}

/// POST /alerts/{id}/restore
///
/// Restore a soft-deleted alert.
pub async fn restore_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_alert_id(&raw_id)?;
    let alert = AlertRepo::restore(&state.pool, id)
        .await?
        .ok_or_else(|| alert_not_found(id))?;

    tracing::info!(alert_id = id, "Alert restored");

    Ok(Json(DataResponse {
        data: AlertView::plain(alert, Utc::now()),
    }))
}

/// DELETE /alerts/{id}/permanent
///
/// Irreversibly remove an alert in any state.
pub async fn permanent_delete_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_alert_id(&raw_id)?;
    if !AlertRepo::hard_delete(&state.pool, id).await? {
        return Err(alert_not_found(id).into());
    }

    tracing::info!(alert_id = id, "Alert permanently deleted");
    Ok(StatusCode::NO_CONTENT)
}
