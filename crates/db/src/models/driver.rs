//! Driver model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fleetledger_core::types::{DbId, Timestamp};

/// A row from the `drivers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Driver {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub license_number: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a driver. `license_number` is unique across drivers.
#[derive(Debug, Deserialize)]
pub struct CreateDriver {
    pub user_id: DbId,
    pub name: String,
    pub license_number: String,
}
