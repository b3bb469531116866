//! HTTP-level integration tests for the `/metadata` endpoints.

mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::{
    body_json, build_test_app, build_test_app_with, get, seed_truck, seed_user, test_config,
};
use sqlx::PgPool;
use fleetledger_core::metadata::{ExpenseCategory, ProfitLoanTreatment};
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_core::window::MonthKey;
use fleetledger_db::models::ledger::{NewFuelExpense, NewLedgerEntry};
use fleetledger_db::repositories::LedgerRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(y: i32, m: u32, d: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

async fn add(
    pool: &PgPool,
    category: ExpenseCategory,
    user_id: DbId,
    truck_id: DbId,
    entry_date: Timestamp,
    amount: f64,
    other_code: Option<&str>,
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
            category: other_code.map(str::to_string),
        },
    )
    .await
    .unwrap();
}

async fn add_fuel(pool: &PgPool, user_id: DbId, truck_id: DbId, entry_date: Timestamp, km: f64) {
    LedgerRepo::insert_fuel(
        pool,
        &NewFuelExpense {
            user_id,
            truck_id,
            entry_date,
            cost: 100.0,
            litres: 50.0,
            current_km: Some(km),
            note: Some("fill-up".to_string()),
        },
    )
    .await
    .unwrap();
}

/// One truck with a July 2025 mix of every category.
async fn seed_july(pool: &PgPool) -> (DbId, DbId) {
    let user_id = seed_user(pool, "ledger@example.com").await;
    let truck_id = seed_truck(pool, user_id, "TRK-1").await;

    add_fuel(pool, user_id, truck_id, at(2025, 7, 3), 1200.0).await;
    add(pool, ExpenseCategory::Def, user_id, truck_id, at(2025, 7, 4), 20.0, None).await;
    add(pool, ExpenseCategory::Other, user_id, truck_id, at(2025, 7, 5), 30.0, Some("tolls")).await;
    add(pool, ExpenseCategory::Income, user_id, truck_id, at(2025, 7, 6), 1000.0, None).await;
    add(pool, ExpenseCategory::Loan, user_id, truck_id, at(2025, 7, 7), 400.0, None).await;

    (user_id, truck_id)
}

const JULY: &str = "start=2025-07-01&end=2025-07-31";

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_totals_require_scope_and_id(pool: PgPool) {
    let response = get(build_test_app(pool.clone()), "/api/v1/metadata/totals?scope=truck").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
    assert_eq!(json["error"], "truck_id is required");

    let response = get(build_test_app(pool.clone()), "/api/v1/metadata/totals?id=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(
        build_test_app(pool),
        "/api/v1/metadata/totals?scope=truck&id=1&start=2025-07-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_totals_for_empty_scope_are_zero(pool: PgPool) {
    let user_id = seed_user(&pool, "empty@example.com").await;

    let json = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/metadata/totals?scope=user&id={user_id}"),
        )
        .await,
    )
    .await;
    let data = &json["data"];

    assert_eq!(data["scope"], "user");
    assert_eq!(data["grand_total"], 0.0);
    assert_eq!(data["income_total"], 0.0);
    assert_eq!(data["fuel_used_total"], 0.0);
    assert_eq!(data["monthly_grand_total"], 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_truck_totals_sum_expenses_only(pool: PgPool) {
    let (_, truck_id) = seed_july(&pool).await;

    let json = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/metadata/totals?scope=truck&id={truck_id}&{JULY}"),
        )
        .await,
    )
    .await;
    let data = &json["data"];

    assert_eq!(data["scope"], "truck");
    assert_eq!(data["fuel_total"], 100.0);
    assert_eq!(data["def_total"], 20.0);
    assert_eq!(data["other_total"], 30.0);
    assert_eq!(data["income_total"], 1000.0);
    assert_eq!(data["grand_total"], 150.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_single_day_window_matches_that_day(pool: PgPool) {
    let (user_id, _) = seed_july(&pool).await;

    let json = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/metadata/totals?scope=user&id={user_id}&start=2025-07-04&end=2025-07-04"),
        )
        .await,
    )
    .await;

    assert_eq!(json["data"]["def_total"], 20.0);
    assert_eq!(json["data"]["grand_total"], 20.0);
}

// ---------------------------------------------------------------------------
// Profit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_profit_follows_loan_treatment(pool: PgPool) {
    let (user_id, _) = seed_july(&pool).await;
    let uri = format!("/api/v1/metadata/profit?scope=user&id={user_id}&{JULY}");

    let json = body_json(get(build_test_app(pool.clone()), &uri).await).await;
    assert_eq!(json["data"]["total_income"], 1000.0);
    assert_eq!(json["data"]["total_expenses"], 150.0);
    assert_eq!(json["data"]["loans_included"], false);
    assert_eq!(json["data"]["profit"], 850.0);

    let mut config = test_config();
    config.profit_loan_treatment = ProfitLoanTreatment::Include;
    let json = body_json(get(build_test_app_with(pool, config), &uri).await).await;
    assert_eq!(json["data"]["total_expenses"], 550.0);
    assert_eq!(json["data"]["loan_total"], 400.0);
    assert_eq!(json["data"]["profit"], 450.0);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_export_rows_are_labelled_and_filterable(pool: PgPool) {
    let (_, truck_id) = seed_july(&pool).await;
    let base = format!("/api/v1/metadata/export?scope=truck&id={truck_id}&{JULY}");

    let json = body_json(get(build_test_app(pool.clone()), &base).await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["amount"], 100.0);
    assert_eq!(rows[0]["note"], "fill-up");
    assert_eq!(rows[2]["category"], "Tolls");

    let json = body_json(get(build_test_app(pool.clone()), &format!("{base}&category=income")).await).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["amount"], 1000.0);

    let response = get(build_test_app(pool), &format!("{base}&category=snacks")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Profile and rollup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_profile_sums_latest_reading_per_truck(pool: PgPool) {
    let user_id = seed_user(&pool, "profile@example.com").await;
    let first = seed_truck(&pool, user_id, "TRK-1").await;
    let second = seed_truck(&pool, user_id, "TRK-2").await;

    add_fuel(&pool, user_id, first, at(2025, 6, 1), 100.0).await;
    add_fuel(&pool, user_id, first, at(2025, 7, 1), 300.0).await;
    add_fuel(&pool, user_id, second, at(2025, 7, 2), 400.0).await;

    let json = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/metadata/profile?user_id={user_id}"),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["total_km"], 700.0);
    assert_eq!(json["data"]["total_trucks"], 2);
    assert!(json["data"]["total_days"].as_i64().unwrap() >= 0);

    let response = get(build_test_app(pool.clone()), "/api/v1/metadata/profile?user_id=9999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(build_test_app(pool), "/api/v1/metadata/profile").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rollup_covers_six_months(pool: PgPool) {
    let user_id = seed_user(&pool, "rollup@example.com").await;
    let truck_id = seed_truck(&pool, user_id, "TRK-1").await;
    add(&pool, ExpenseCategory::Income, user_id, truck_id, Utc::now(), 250.0, None).await;

    let json = body_json(
        get(
            build_test_app(pool),
            &format!("/api/v1/metadata/rollup?user_id={user_id}"),
        )
        .await,
    )
    .await;
    let income = json["data"]["income_data"].as_array().unwrap();
    let expenses = json["data"]["expenses_data"].as_array().unwrap();

    assert_eq!(income.len(), 6);
    assert_eq!(expenses.len(), 18);
    assert_eq!(income[5]["amount"], 250.0);
    assert!(income[..5].iter().all(|point| point["amount"] == 0.0));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rollup_months_agree_with_totals(pool: PgPool) {
    let user_id = seed_user(&pool, "agree@example.com").await;
    let truck_id = seed_truck(&pool, user_id, "TRK-1").await;

    let current = MonthKey::of(Utc::now().date_naive());
    let previous = current.previous();
    let noon = |month: MonthKey| month.first_day().and_hms_opt(12, 0, 0).unwrap().and_utc();

    add_fuel(&pool, user_id, truck_id, noon(current), 1500.0).await;
    add(&pool, ExpenseCategory::Def, user_id, truck_id, noon(current), 20.0, None).await;
    add(&pool, ExpenseCategory::Other, user_id, truck_id, noon(current), 30.0, Some("tolls")).await;
    add(&pool, ExpenseCategory::Def, user_id, truck_id, noon(previous), 15.0, None).await;
    add(&pool, ExpenseCategory::Other, user_id, truck_id, noon(previous), 5.0, Some("parking")).await;

    let rollup = body_json(
        get(
            build_test_app(pool.clone()),
            &format!("/api/v1/metadata/rollup?user_id={user_id}"),
        )
        .await,
    )
    .await;
    let expenses = rollup["data"]["expenses_data"].as_array().unwrap();

    // Three points per month, oldest month first.
    for (month, points) in [(previous, &expenses[12..15]), (current, &expenses[15..18])] {
        assert!(points.iter().all(|point| point["year"] == month.year));
        let rollup_sum: f64 = points.iter().map(|point| point["amount"].as_f64().unwrap()).sum();
        assert!(rollup_sum > 0.0);

        let totals = body_json(
            get(
                build_test_app(pool.clone()),
                &format!(
                    "/api/v1/metadata/totals?scope=user&id={user_id}&start={}&end={}",
                    month.first_day(),
                    month.last_day()
                ),
            )
            .await,
        )
        .await;
        assert_eq!(totals["data"]["grand_total"].as_f64().unwrap(), rollup_sum);
    }
}
