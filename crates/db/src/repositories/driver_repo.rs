//! Repository for the `drivers` table.

use sqlx::PgPool;
use fleetledger_core::types::DbId;

use crate::models::driver::{CreateDriver, Driver};

/// Column list for drivers queries.
const COLUMNS: &str = "id, user_id, name, license_number, created_at, updated_at";

/// Provides lookups and inserts for drivers.
pub struct DriverRepo;

impl DriverRepo {
    /// Insert a new driver. Fails with a unique violation on
    /// `uq_drivers_license_number` when the license is already registered.
    pub async fn create(pool: &PgPool, input: &CreateDriver) -> Result<Driver, sqlx::Error> {
        let query = format!(
            "INSERT INTO drivers (user_id, name, license_number)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Driver>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.license_number)
            .fetch_one(pool)
            .await
    }

    /// Find a driver by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Driver>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM drivers WHERE id = $1");
        sqlx::query_as::<_, Driver>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a driver.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
