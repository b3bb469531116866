//! Route definitions for the `/alerts` resource.

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Routes mounted at `/alerts`.
///
/// ```text
/// GET    /                  -> list_alerts     (?user_id&is_read&alert_type&priority&date_filter&page&limit&sort_by&sort_order)
/// POST   /                  -> create_alert
/// GET    /summary           -> alert_summary   (?user_id)
/// PATCH  /read-all          -> mark_all_read   (?user_id)
/// GET    /{id}              -> get_alert
/// PUT    /{id}              -> update_alert
/// DELETE /{id}              -> delete_alert    (soft)
/// PATCH  /{id}/read         -> mark_read
/// POST   /{id}/done         -> mark_recurring_done
/// POST   /{id}/restore      -> restore_alert
/// DELETE /{id}/permanent    -> permanent_delete_alert
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alerts::list_alerts).post(alerts::create_alert))
        .route("/summary", get(alerts::alert_summary))
        .route("/read-all", patch(alerts::mark_all_read))
        .route(
            "/{id}",
            get(alerts::get_alert)
                .put(alerts::update_alert)
                .delete(alerts::delete_alert),
        )
        .route("/{id}/read", patch(alerts::mark_read))
        .route("/{id}/done", post(alerts::mark_recurring_done))
        .route("/{id}/restore", post(alerts::restore_alert))
        .route("/{id}/permanent", delete(alerts::permanent_delete_alert))
}
