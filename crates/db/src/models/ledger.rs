//! Date-stamped money records: fuel, DEF, other expenses, incomes, loans.
//!
//! The engine only reads these tables; the insert DTOs exist so records can
//! be seeded by other services and tests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use fleetledger_core::types::{DbId, Timestamp};

/// Insert DTO for a fuel purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFuelExpense {
    pub user_id: DbId,
    pub truck_id: DbId,
    pub entry_date: Timestamp,
    pub cost: f64,
    pub litres: f64,
    pub current_km: Option<f64>,
    pub note: Option<String>,
}

/// Insert DTO for DEF, other-expense, income and loan records.
///
/// `category` is only meaningful for other expenses.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLedgerEntry {
    pub user_id: DbId,
    pub truck_id: DbId,
    pub entry_date: Timestamp,
    pub amount: f64,
    pub note: Option<String>,
    pub category: Option<String>,
}

/// A record read back for export.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerRow {
    pub entry_date: Timestamp,
    pub amount: f64,
    pub note: Option<String>,
    pub category: Option<String>,
}

/// Sum of one category for one calendar month.
#[derive(Debug, Clone, FromRow)]
pub struct MonthlySumRow {
    pub year: i32,
    pub month: i32,
    pub amount: f64,
}

/// The most recent odometer reading of one truck.
#[derive(Debug, Clone, FromRow)]
pub struct KmReadingRow {
    pub truck_id: DbId,
    pub entry_date: Timestamp,
    pub current_km: f64,
}
