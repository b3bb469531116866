//! Shared query parameter types for API handlers.

use serde::Deserialize;
use fleetledger_core::types::DbId;

/// `?user_id=` for endpoints scoped to one owner.
#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub user_id: Option<DbId>,
}
