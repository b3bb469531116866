//! Repository for the `trucks` table.

use sqlx::PgPool;
use fleetledger_core::types::DbId;

use crate::models::truck::{CreateTruck, Truck};

/// Column list for trucks queries.
const COLUMNS: &str = "id, user_id, truck_number, make, model, year, created_at, updated_at";

/// Provides lookups and inserts for trucks.
pub struct TruckRepo;

impl TruckRepo {
    /// Insert a new truck, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTruck) -> Result<Truck, sqlx::Error> {
        let query = format!(
            "INSERT INTO trucks (user_id, truck_number, make, model, year)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Truck>(&query)
            .bind(input.user_id)
            .bind(&input.truck_number)
            .bind(&input.make)
            .bind(&input.model)
            .bind(input.year)
            .fetch_one(pool)
            .await
    }

    /// Find a truck by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Truck>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM trucks WHERE id = $1");
        sqlx::query_as::<_, Truck>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of trucks owned by a user.
    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trucks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Permanently delete a truck. Its ledger records go with it; alerts that
    /// mention it keep the dangling id.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trucks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
