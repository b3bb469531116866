//! Route definitions for the `/metadata` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::metadata;
use crate::state::AppState;

/// Routes mounted at `/metadata`.
///
/// ```text
/// GET /totals     -> get_totals        (?scope&id&start&end)
/// GET /profit     -> get_profit        (?scope&id&start&end)
/// GET /export     -> get_export_rows   (?scope&id&start&end&category)
/// GET /profile    -> get_profile       (?user_id)
/// GET /rollup     -> get_rollup        (?user_id)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/totals", get(metadata::get_totals))
        .route("/profit", get(metadata::get_profit))
        .route("/export", get(metadata::get_export_rows))
        .route("/profile", get(metadata::get_profile))
        .route("/rollup", get(metadata::get_rollup))
}
