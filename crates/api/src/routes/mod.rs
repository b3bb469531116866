pub mod alerts;
pub mod health;
pub mod metadata;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /alerts                          list, create
/// /alerts/summary                  counts, breakdowns, upcoming
/// /alerts/read-all                 mark every alert of a user read (PATCH)
/// /alerts/{id}                     get, update, soft delete
/// /alerts/{id}/read                set read state (PATCH)
/// /alerts/{id}/done                complete a recurring alert (POST)
/// /alerts/{id}/restore             undo a soft delete (POST)
/// /alerts/{id}/permanent           hard delete (DELETE)
///
/// /metadata/totals                 category totals for a truck or user
/// /metadata/profit                 income minus expenses
/// /metadata/export                 flat rows for the spreadsheet exporter
/// /metadata/profile                odometer, truck count, account age
/// /metadata/rollup                 trailing six-month series
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Reminders and recurring maintenance alerts.
        .nest("/alerts", alerts::router())
        // Fleet aggregation endpoints.
        .nest("/metadata", metadata::router())
}
