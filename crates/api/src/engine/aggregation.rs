//! Time-windowed aggregation over the ledger tables.
//!
//! Each public function fans out one read per category and merges the
//! results by field. The reads for one request run concurrently on the pool.

use std::collections::HashMap;

use futures::future::try_join_all;
use sqlx::PgPool;
use fleetledger_core::error::CoreError;
use fleetledger_core::metadata::{
    build_rollup, export_label, latest_km_total, sort_export_rows, total_days, CategorySums,
    ExpenseCategory, ExportRow, KmReading, ProfileMetrics, ProfitLoanTreatment, ProfitSummary,
    Rollup, Scope, ScopedTotals, TotalsScope, TruckScopedTotals, UserScopedTotals,
    ROLLUP_MONTHS,
};
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_core::window::{
    end_of_day, start_of_day, trailing_months, DateWindow, MonthKey, WindowFilter,
};
use fleetledger_db::repositories::{LedgerRepo, TruckRepo, UserRepo};

use crate::error::AppResult;

/// Stateless aggregation service over a connection pool.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Resolve the effective filter for a scope.
    ///
    /// Truck figures default to the current calendar month; user figures
    /// default to all time.
    pub fn default_filter(
        kind: TotalsScope,
        window: Option<&DateWindow>,
        now: Timestamp,
    ) -> WindowFilter {
        match (kind, window) {
            (_, Some(window)) => window.filter(),
            (TotalsScope::Truck, None) => DateWindow::current_month(now).filter(),
            (TotalsScope::User, None) => WindowFilter::All,
        }
    }

    /// Sum every category, and fuel litres, for one scope and filter.
    pub async fn category_sums(
        pool: &PgPool,
        scope: Scope,
        filter: WindowFilter,
    ) -> AppResult<CategorySums> {
        let sums = try_join_all(
            ExpenseCategory::ALL
                .into_iter()
                .map(|category| LedgerRepo::sum(pool, category, scope, filter)),
        );
        let litres = LedgerRepo::fuel_litres(pool, scope, filter);
        let (amounts, fuel_litres) = tokio::try_join!(sums, litres)?;

        let mut merged = CategorySums {
            fuel_litres,
            ..CategorySums::default()
        };
        for (category, amount) in ExpenseCategory::ALL.into_iter().zip(amounts) {
            merged.add(category, amount);
        }
        Ok(merged)
    }

    /// Totals for one truck. Without a window, the current calendar month.
    pub async fn totals_for_truck(
        pool: &PgPool,
        truck_id: DbId,
        window: Option<&DateWindow>,
        now: Timestamp,
    ) -> AppResult<TruckScopedTotals> {
        let filter = Self::default_filter(TotalsScope::Truck, window, now);
        let sums = Self::category_sums(pool, Scope::truck(truck_id), filter).await?;
        Ok(TruckScopedTotals::from(&sums))
    }

    /// Totals across a user's records. Without a window, all time. The
    /// nested monthly figures always cover the current calendar month.
    pub async fn totals_for_user(
        pool: &PgPool,
        user_id: DbId,
        window: Option<&DateWindow>,
        now: Timestamp,
    ) -> AppResult<UserScopedTotals> {
        let scope = Scope::user(user_id);
        let filter = Self::default_filter(TotalsScope::User, window, now);
        let month = DateWindow::current_month(now).filter();

        let (window_sums, month_sums) = tokio::try_join!(
            Self::category_sums(pool, scope, filter),
            Self::category_sums(pool, scope, month),
        )?;
        Ok(UserScopedTotals::new(&window_sums, &month_sums))
    }

    /// Totals for whichever scope the caller selected.
    pub async fn totals(
        pool: &PgPool,
        scope: Scope,
        window: Option<&DateWindow>,
        now: Timestamp,
    ) -> AppResult<ScopedTotals> {
        Ok(match scope.kind {
            TotalsScope::Truck => {
                ScopedTotals::Truck(Self::totals_for_truck(pool, scope.id, window, now).await?)
            }
            TotalsScope::User => {
                ScopedTotals::User(Self::totals_for_user(pool, scope.id, window, now).await?)
            }
        })
    }

    /// Income minus expenses for a scope and window.
    pub async fn profit_for_window(
        pool: &PgPool,
        scope: Scope,
        window: Option<&DateWindow>,
        now: Timestamp,
        treatment: ProfitLoanTreatment,
    ) -> AppResult<ProfitSummary> {
        let filter = Self::default_filter(scope.kind, window, now);
        let sums = Self::category_sums(pool, scope, filter).await?;
        Ok(ProfitSummary::compute(&sums, treatment))
    }

    /// Odometer total, truck count, and account age for a user.
    pub async fn profile_metrics(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> AppResult<ProfileMetrics> {
        let user = UserRepo::find_by_id(pool, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        let (total_trucks, readings) = tokio::try_join!(
            TruckRepo::count_for_user(pool, user_id),
            LedgerRepo::latest_km_readings(pool, user_id),
        )?;

        let readings: Vec<KmReading> = readings
            .into_iter()
            .map(|r| KmReading {
                truck_id: r.truck_id,
                date: r.entry_date,
                current_km: r.current_km,
            })
            .collect();

        Ok(ProfileMetrics {
            total_km: latest_km_total(&readings),
            total_trucks,
            total_days: total_days(user.created_at, now),
        })
    }

    /// Monthly expense and income series for the trailing six months,
    /// oldest first, current month included.
    pub async fn six_month_rollup(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> AppResult<Rollup> {
        let months = trailing_months(now.date_naive(), ROLLUP_MONTHS);
        let (Some(first), Some(last)) = (months.first(), months.last()) else {
            return Ok(build_rollup(&months, &HashMap::new()));
        };
        let from = start_of_day(first.first_day());
        let to = end_of_day(last.last_day());

        let categories = [
            ExpenseCategory::Fuel,
            ExpenseCategory::Def,
            ExpenseCategory::Other,
            ExpenseCategory::Income,
        ];
        let per_category = try_join_all(
            categories
                .into_iter()
                .map(|category| LedgerRepo::monthly_sums(pool, category, user_id, from, to)),
        )
        .await?;

        let mut by_month: HashMap<MonthKey, CategorySums> = HashMap::new();
        for (category, rows) in categories.into_iter().zip(per_category) {
            for row in rows {
                let key = MonthKey {
                    year: row.year,
                    month: row.month.clamp(1, 12) as u32,
                };
                by_month.entry(key).or_default().add(category, row.amount);
            }
        }

        Ok(build_rollup(&months, &by_month))
    }

    /// Flat rows for the spreadsheet exporter, sorted by date.
    ///
    /// `category` of `None` exports every table.
    pub async fn export_rows(
        pool: &PgPool,
        scope: Scope,
        window: Option<&DateWindow>,
        category: Option<ExpenseCategory>,
        now: Timestamp,
    ) -> AppResult<Vec<ExportRow>> {
        let filter = Self::default_filter(scope.kind, window, now);
        let categories: Vec<ExpenseCategory> = match category {
            Some(category) => vec![category],
            None => ExpenseCategory::ALL.to_vec(),
        };

        let per_category = try_join_all(
            categories
                .iter()
                .map(|&category| LedgerRepo::export_rows(pool, category, scope, filter)),
        )
        .await?;

        let mut rows: Vec<ExportRow> = categories
            .into_iter()
            .zip(per_category)
            .flat_map(|(category, records)| {
                records.into_iter().map(move |record| ExportRow {
                    date: record.entry_date,
                    category: export_label(category, record.category.as_deref()),
                    amount: record.amount,
                    note: record.note,
                })
            })
            .collect();
        sort_export_rows(&mut rows);
        Ok(rows)
    }
}
