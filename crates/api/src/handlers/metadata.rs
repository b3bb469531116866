//! Handlers for fleet metadata: windowed totals, profit, profile figures,
//! the six-month rollup, and export rows.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use fleetledger_core::metadata::{require_id, ExpenseCategory, Scope, Totals, TotalsScope};
use fleetledger_core::types::DbId;
use fleetledger_core::window::DateWindow;

use crate::engine::AggregationEngine;
use crate::error::AppResult;
use crate::query::UserParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// `?scope=truck|user&id=&start=&end=` shared by the windowed endpoints.
#[derive(Debug, Deserialize)]
pub struct ScopedWindowParams {
    pub scope: Option<String>,
    pub id: Option<DbId>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// Export only: `all`, `fuel`, `def`, `other`, `income`, or `loan`.
    pub category: Option<String>,
}

impl ScopedWindowParams {
    fn resolve(&self) -> AppResult<(Scope, Option<DateWindow>)> {
        let scope = Scope::from_query(self.scope.as_deref(), self.id)?;
        let window = DateWindow::from_query(self.start.as_deref(), self.end.as_deref())?;
        Ok((scope, window))
    }
}

/// GET /metadata/totals?scope=&id=&start=&end=
///
/// Category totals for a truck or a user. Truck totals default to the
/// current month, user totals to all time.
pub async fn get_totals(
    State(state): State<AppState>,
    params: Result<Query<ScopedWindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let (scope, window) = params.resolve()?;

    let totals = AggregationEngine::totals(&state.pool, scope, window.as_ref(), Utc::now()).await?;

    tracing::debug!(
        scope_id = scope.id,
        grand_total = totals.grand_total(),
        "Totals computed"
    );
    Ok(Json(DataResponse { data: totals }))
}

/// GET /metadata/profit?scope=&id=&start=&end=
///
/// Income minus expenses. Loans count as expenses only when configured.
pub async fn get_profit(
    State(state): State<AppState>,
    params: Result<Query<ScopedWindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let (scope, window) = params.resolve()?;

    let profit = AggregationEngine::profit_for_window(
        &state.pool,
        scope,
        window.as_ref(),
        Utc::now(),
        state.config.profit_loan_treatment,
    )
    .await?;
    Ok(Json(DataResponse { data: profit }))
}

/// GET /metadata/export?scope=&id=&start=&end=&category=
///
/// Flat rows for the spreadsheet exporter, sorted by date.
pub async fn get_export_rows(
    State(state): State<AppState>,
    params: Result<Query<ScopedWindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let (scope, window) = params.resolve()?;
    let category = ExpenseCategory::parse_filter(params.category.as_deref())?;

    let rows =
        AggregationEngine::export_rows(&state.pool, scope, window.as_ref(), category, Utc::now())
            .await?;

    tracing::debug!(
        scope_id = scope.id,
        category = category.map(|c| c.code()),
        row_count = rows.len(),
        "Export rows built"
    );
    Ok(Json(DataResponse { data: rows }))
}

/// GET /metadata/profile?user_id=
///
/// Odometer total, truck count, and days since the account was created.
pub async fn get_profile(
    State(state): State<AppState>,
    params: Result<Query<UserParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let user_id = require_id(params.user_id, TotalsScope::User)?;

    let profile = AggregationEngine::profile_metrics(&state.pool, user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: profile }))
}

/// GET /metadata/rollup?user_id=
///
/// Trailing six-month expense and income series.
pub async fn get_rollup(
    State(state): State<AppState>,
    params: Result<Query<UserParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let user_id = require_id(params.user_id, TotalsScope::User)?;

    let rollup = AggregationEngine::six_month_rollup(&state.pool, user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: rollup }))
}
