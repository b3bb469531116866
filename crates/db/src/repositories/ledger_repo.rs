//! Repository for the date-stamped money tables.
//!
//! Table and column names come from [`ExpenseCategory`] and [`TotalsScope`],
//! never from caller input. Date windows bind through one fixed fragment so a
//! single statement serves the all-time, single-day, and range shapes.

use sqlx::PgPool;
use fleetledger_core::metadata::{ExpenseCategory, Scope};
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_core::window::WindowFilter;

use crate::models::ledger::{
    KmReadingRow, LedgerRow, MonthlySumRow, NewFuelExpense, NewLedgerEntry,
};

/// Window predicate over `entry_date`. Binds `$2` (from), `$3` (to), `$4` (day).
const WINDOW_SQL: &str = "($2::timestamptz IS NULL OR entry_date >= $2) \
    AND ($3::timestamptz IS NULL OR entry_date <= $3) \
    AND ($4::date IS NULL OR (entry_date AT TIME ZONE 'UTC')::date = $4)";

/// Read access to fuel, DEF, other-expense, income and loan records.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Sum of one category's money column for a scope and window. Zero when
    /// nothing matches.
    pub async fn sum(
        pool: &PgPool,
        category: ExpenseCategory,
        scope: Scope,
        filter: WindowFilter,
    ) -> Result<f64, sqlx::Error> {
        Self::sum_column(pool, category.table(), category.amount_column(), scope, filter).await
    }

    /// Litres of fuel purchased for a scope and window.
    pub async fn fuel_litres(
        pool: &PgPool,
        scope: Scope,
        filter: WindowFilter,
    ) -> Result<f64, sqlx::Error> {
        Self::sum_column(pool, ExpenseCategory::Fuel.table(), "litres", scope, filter).await
    }

    async fn sum_column(
        pool: &PgPool,
        table: &str,
        column: &str,
        scope: Scope,
        filter: WindowFilter,
    ) -> Result<f64, sqlx::Error> {
        let (from, to, day) = filter.binds();
        let query = format!(
            "SELECT COALESCE(SUM({column}), 0)::float8 FROM {table}
             WHERE {} = $1 AND {WINDOW_SQL}",
            scope.kind.column()
        );
        sqlx::query_scalar::<_, f64>(&query)
            .bind(scope.id)
            .bind(from)
            .bind(to)
            .bind(day)
            .fetch_one(pool)
            .await
    }

    /// Per-calendar-month sums of one category for a user between two
    /// instants, inclusive. Months without records are absent.
    pub async fn monthly_sums(
        pool: &PgPool,
        category: ExpenseCategory,
        user_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<MonthlySumRow>, sqlx::Error> {
        let query = format!(
            "SELECT
                EXTRACT(YEAR FROM entry_date AT TIME ZONE 'UTC')::int4 AS year,
                EXTRACT(MONTH FROM entry_date AT TIME ZONE 'UTC')::int4 AS month,
                COALESCE(SUM({column}), 0)::float8 AS amount
             FROM {table}
             WHERE user_id = $1 AND entry_date >= $2 AND entry_date <= $3
             GROUP BY 1, 2
             ORDER BY 1, 2",
            column = category.amount_column(),
            table = category.table(),
        );
        sqlx::query_as::<_, MonthlySumRow>(&query)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// The latest odometer reading of each of a user's trucks.
    ///
    /// Fuel records without a reading are skipped. Ties on date fall to the
    /// most recently inserted record.
    pub async fn latest_km_readings(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<KmReadingRow>, sqlx::Error> {
        sqlx::query_as::<_, KmReadingRow>(
            "SELECT DISTINCT ON (f.truck_id) f.truck_id, f.entry_date, f.current_km
             FROM fuel_expenses f
             JOIN trucks t ON t.id = f.truck_id
             WHERE t.user_id = $1 AND f.current_km IS NOT NULL
             ORDER BY f.truck_id, f.entry_date DESC, f.id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Raw records of one category for a scope and window, oldest first.
    pub async fn export_rows(
        pool: &PgPool,
        category: ExpenseCategory,
        scope: Scope,
        filter: WindowFilter,
    ) -> Result<Vec<LedgerRow>, sqlx::Error> {
        let (from, to, day) = filter.binds();
        let query = format!(
            "SELECT entry_date, {column}::float8 AS amount, note, category
             FROM {table}
             WHERE {scope_column} = $1 AND {WINDOW_SQL}
             ORDER BY entry_date, id",
            column = category.amount_column(),
            table = category.table(),
            scope_column = scope.kind.column(),
        );
        sqlx::query_as::<_, LedgerRow>(&query)
            .bind(scope.id)
            .bind(from)
            .bind(to)
            .bind(day)
            .fetch_all(pool)
            .await
    }

    /// Record a fuel purchase, returning its id.
    pub async fn insert_fuel(pool: &PgPool, input: &NewFuelExpense) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO fuel_expenses
                (user_id, truck_id, entry_date, cost, litres, current_km, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(input.truck_id)
        .bind(input.entry_date)
        .bind(input.cost)
        .bind(input.litres)
        .bind(input.current_km)
        .bind(&input.note)
        .fetch_one(pool)
        .await
    }

    /// Record an entry in the given category's table, returning its id.
    ///
    /// Fuel entries written this way carry no litres or odometer reading.
    pub async fn insert(
        pool: &PgPool,
        category: ExpenseCategory,
        input: &NewLedgerEntry,
    ) -> Result<DbId, sqlx::Error> {
        let query = format!(
            "INSERT INTO {table}
                (user_id, truck_id, entry_date, {column}, note, category)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
            table = category.table(),
            column = category.amount_column(),
        );
        sqlx::query_scalar::<_, DbId>(&query)
            .bind(input.user_id)
            .bind(input.truck_id)
            .bind(input.entry_date)
            .bind(input.amount)
            .bind(&input.note)
            .bind(&input.category)
            .fetch_one(pool)
            .await
    }
}
