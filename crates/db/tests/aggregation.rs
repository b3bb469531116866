//! Integration tests for the ledger sums behind the metadata endpoints.

use chrono::{NaiveDate, TimeZone, Utc};
use sqlx::PgPool;
use fleetledger_core::metadata::{ExpenseCategory, Scope};
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_core::window::{end_of_day, start_of_day, DateWindow, WindowFilter};
use fleetledger_db::models::ledger::{NewFuelExpense, NewLedgerEntry};
use fleetledger_db::models::truck::CreateTruck;
use fleetledger_db::models::user::CreateUser;
use fleetledger_db::repositories::{LedgerRepo, TruckRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(
        pool,
        &CreateUser {
            name: "Owner".to_string(),
            email: email.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_truck(pool: &PgPool, user_id: DbId, number: &str) -> DbId {
    TruckRepo::create(
        pool,
        &CreateTruck {
            user_id,
            truck_number: number.to_string(),
            make: None,
            model: None,
            year: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn add(
    pool: &PgPool,
    category: ExpenseCategory,
    user_id: DbId,
    truck_id: DbId,
    entry_date: Timestamp,
    amount: f64,
) {
    LedgerRepo::insert(
        pool,
        category,
        &NewLedgerEntry {
            user_id,
            truck_id,
            entry_date,
            amount,
            note: None,
            category: None,
        },
    )
    .await
    .unwrap();
}

async fn add_fuel(
    pool: &PgPool,
    user_id: DbId,
    truck_id: DbId,
    entry_date: Timestamp,
    current_km: Option<f64>,
) {
    LedgerRepo::insert_fuel(
        pool,
        &NewFuelExpense {
            user_id,
            truck_id,
            entry_date,
            cost: 100.0,
            litres: 50.0,
            current_km,
            note: None,
        },
    )
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Sums
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_scope_sums_to_zero(pool: PgPool) {
    for category in ExpenseCategory::ALL {
        let sum = LedgerRepo::sum(&pool, category, Scope::truck(42), WindowFilter::All)
            .await
            .unwrap();
        assert_eq!(sum, 0.0, "{category:?} should sum to zero");
    }
    let litres = LedgerRepo::fuel_litres(&pool, Scope::user(42), WindowFilter::All)
        .await
        .unwrap();
    assert_eq!(litres, 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sums_follow_scope_column(pool: PgPool) {
    let user_id = seed_user(&pool, "scope@example.com").await;
    let t1 = seed_truck(&pool, user_id, "T-1").await;
    let t2 = seed_truck(&pool, user_id, "T-2").await;
    let when = at(2025, 6, 10, 12, 0);

    add(&pool, ExpenseCategory::Def, user_id, t1, when, 30.0).await;
    add(&pool, ExpenseCategory::Def, user_id, t2, when, 12.5).await;

    let truck = LedgerRepo::sum(&pool, ExpenseCategory::Def, Scope::truck(t1), WindowFilter::All)
        .await
        .unwrap();
    let user = LedgerRepo::sum(&pool, ExpenseCategory::Def, Scope::user(user_id), WindowFilter::All)
        .await
        .unwrap();
    assert_eq!(truck, 30.0);
    assert_eq!(user, 42.5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_day_window_matches_inclusive_range(pool: PgPool) {
    let user_id = seed_user(&pool, "day@example.com").await;
    let truck_id = seed_truck(&pool, user_id, "T-1").await;

    add(&pool, ExpenseCategory::Other, user_id, truck_id, at(2025, 6, 14, 23, 59), 1.0).await;
    add(&pool, ExpenseCategory::Other, user_id, truck_id, at(2025, 6, 15, 0, 0), 10.0).await;
    add(&pool, ExpenseCategory::Other, user_id, truck_id, at(2025, 6, 15, 23, 59), 100.0).await;
    add(&pool, ExpenseCategory::Other, user_id, truck_id, at(2025, 6, 16, 0, 0), 1000.0).await;

    let day = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let window = DateWindow::single_day(day);
    assert_eq!(window.filter(), WindowFilter::Day(day));

    let scope = Scope::truck(truck_id);
    let by_day = LedgerRepo::sum(&pool, ExpenseCategory::Other, scope, window.filter())
        .await
        .unwrap();
    let by_range = LedgerRepo::sum(
        &pool,
        ExpenseCategory::Other,
        scope,
        WindowFilter::Range {
            from: start_of_day(day),
            to: end_of_day(day),
        },
    )
    .await
    .unwrap();

    assert_eq!(by_day, 110.0);
    assert_eq!(by_day, by_range);

    let rows = LedgerRepo::export_rows(&pool, ExpenseCategory::Other, scope, window.filter())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_monthly_sums_group_by_calendar_month(pool: PgPool) {
    let user_id = seed_user(&pool, "monthly@example.com").await;
    let truck_id = seed_truck(&pool, user_id, "T-1").await;

    add(&pool, ExpenseCategory::Income, user_id, truck_id, at(2025, 7, 1, 0, 0), 500.0).await;
    add(&pool, ExpenseCategory::Income, user_id, truck_id, at(2025, 7, 31, 23, 0), 250.0).await;
    add(&pool, ExpenseCategory::Income, user_id, truck_id, at(2025, 8, 2, 8, 0), 75.0).await;

    let rows = LedgerRepo::monthly_sums(
        &pool,
        ExpenseCategory::Income,
        user_id,
        at(2025, 3, 1, 0, 0),
        at(2025, 8, 31, 23, 59),
    )
    .await
    .unwrap();

    let flat: Vec<_> = rows.iter().map(|r| (r.year, r.month, r.amount)).collect();
    assert_eq!(flat, vec![(2025, 7, 750.0), (2025, 8, 75.0)]);
}

// ---------------------------------------------------------------------------
// Odometer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_latest_km_reading_per_truck(pool: PgPool) {
    let user_id = seed_user(&pool, "km@example.com").await;
    let a = seed_truck(&pool, user_id, "A").await;
    let b = seed_truck(&pool, user_id, "B").await;

    // Inserted out of date order on purpose.
    add_fuel(&pool, user_id, a, at(2025, 5, 20, 9, 0), Some(400.0)).await;
    add_fuel(&pool, user_id, a, at(2025, 5, 1, 9, 0), Some(100.0)).await;
    add_fuel(&pool, user_id, a, at(2025, 5, 10, 9, 0), Some(250.0)).await;
    add_fuel(&pool, user_id, b, at(2025, 5, 3, 9, 0), Some(50.0)).await;
    add_fuel(&pool, user_id, b, at(2025, 5, 15, 9, 0), Some(300.0)).await;
    add_fuel(&pool, user_id, b, at(2025, 5, 25, 9, 0), None).await;

    let readings = LedgerRepo::latest_km_readings(&pool, user_id).await.unwrap();
    let total: f64 = readings.iter().map(|r| r.current_km).sum();
    assert_eq!(readings.len(), 2);
    assert_eq!(total, 700.0);
}
