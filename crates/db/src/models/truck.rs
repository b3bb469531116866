//! Truck model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fleetledger_core::types::{DbId, Timestamp};

/// A row from the `trucks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Truck {
    pub id: DbId,
    pub user_id: DbId,
    pub truck_number: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a truck.
#[derive(Debug, Deserialize)]
pub struct CreateTruck {
    pub user_id: DbId,
    pub truck_number: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
}
