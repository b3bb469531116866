//! Aggregation rules for fleet metadata.
//!
//! Category tables, scope discriminators, and the reductions that merge
//! per-category sums into totals, profit, the six-month rollup, and flat
//! export rows. Sums arrive from the repository layer already filtered by
//! scope and window; nothing here raises on empty input.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::window::MonthKey;

/// Number of months in the trend rollup, current month included.
pub const ROLLUP_MONTHS: usize = 6;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A record table feeding the aggregation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseCategory {
    Fuel,
    Def,
    Other,
    Income,
    Loan,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Def,
        ExpenseCategory::Other,
        ExpenseCategory::Income,
        ExpenseCategory::Loan,
    ];

    /// Categories that make up the grand total.
    pub const EXPENSES: [ExpenseCategory; 3] = [
        ExpenseCategory::Fuel,
        ExpenseCategory::Def,
        ExpenseCategory::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "fuel",
            ExpenseCategory::Def => "def",
            ExpenseCategory::Other => "other",
            ExpenseCategory::Income => "income",
            ExpenseCategory::Loan => "loan",
        }
    }

    /// Display label used in charts and export rows.
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "Fuel",
            ExpenseCategory::Def => "DEF",
            ExpenseCategory::Other => "Other",
            ExpenseCategory::Income => "Income",
            ExpenseCategory::Loan => "Loan",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "fuel_expenses",
            ExpenseCategory::Def => "def_expenses",
            ExpenseCategory::Other => "other_expenses",
            ExpenseCategory::Income => "incomes",
            ExpenseCategory::Loan => "loans",
        }
    }

    /// Column holding the money value.
    pub fn amount_column(&self) -> &'static str {
        match self {
            ExpenseCategory::Income | ExpenseCategory::Loan => "amount",
            _ => "cost",
        }
    }

    /// Parse an export filter. `None` or `"all"` selects every category.
    pub fn parse_filter(value: Option<&str>) -> Result<Option<Self>, CoreError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None | Some("all") => Ok(None),
            Some(code) => Self::ALL
                .into_iter()
                .find(|c| c.code() == code)
                .map(Some)
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Invalid category '{code}'. Must be one of: all, fuel, def, other, income, loan"
                    ))
                }),
        }
    }
}

/// Category codes stored on other-expense records and their display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherCategory {
    Maintenance,
    Repair,
    Tires,
    Insurance,
    Permits,
    Tolls,
    Parking,
    Scale,
    Lumper,
    Wash,
    TruckPayment,
    Other,
}

impl OtherCategory {
    pub const ALL: [OtherCategory; 12] = [
        OtherCategory::Maintenance,
        OtherCategory::Repair,
        OtherCategory::Tires,
        OtherCategory::Insurance,
        OtherCategory::Permits,
        OtherCategory::Tolls,
        OtherCategory::Parking,
        OtherCategory::Scale,
        OtherCategory::Lumper,
        OtherCategory::Wash,
        OtherCategory::TruckPayment,
        OtherCategory::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            OtherCategory::Maintenance => "maintenance",
            OtherCategory::Repair => "repair",
            OtherCategory::Tires => "tires",
            OtherCategory::Insurance => "insurance",
            OtherCategory::Permits => "permits",
            OtherCategory::Tolls => "tolls",
            OtherCategory::Parking => "parking",
            OtherCategory::Scale => "scale",
            OtherCategory::Lumper => "lumper",
            OtherCategory::Wash => "wash",
            OtherCategory::TruckPayment => "truck_payment",
            OtherCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OtherCategory::Maintenance => "Maintenance",
            OtherCategory::Repair => "Repairs",
            OtherCategory::Tires => "Tires",
            OtherCategory::Insurance => "Insurance",
            OtherCategory::Permits => "Permits & Licenses",
            OtherCategory::Tolls => "Tolls",
            OtherCategory::Parking => "Parking",
            OtherCategory::Scale => "Scale Tickets",
            OtherCategory::Lumper => "Lumper Fees",
            OtherCategory::Wash => "Truck Wash",
            OtherCategory::TruckPayment => "Truck Payment",
            OtherCategory::Other => "Other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Display label for a stored code. Unknown codes are shown verbatim and a
    /// missing code shows as `"Other"`.
    pub fn display_label(code: Option<&str>) -> String {
        match code.map(str::trim).filter(|c| !c.is_empty()) {
            None => OtherCategory::Other.label().to_string(),
            Some(code) => Self::from_code(code)
                .map(|c| c.label().to_string())
                .unwrap_or_else(|| code.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Which identity a total is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsScope {
    Truck,
    User,
}

impl TotalsScope {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "truck" => Ok(TotalsScope::Truck),
            "user" => Ok(TotalsScope::User),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid scope '{other}'. Must be one of: truck, user"
            ))),
        }
    }

    /// Column on every record table that holds this scope's id.
    pub fn column(&self) -> &'static str {
        match self {
            TotalsScope::Truck => "truck_id",
            TotalsScope::User => "user_id",
        }
    }
}

/// A scope discriminator with its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub kind: TotalsScope,
    pub id: DbId,
}

impl Scope {
    pub fn truck(id: DbId) -> Self {
        Self { kind: TotalsScope::Truck, id }
    }

    pub fn user(id: DbId) -> Self {
        Self { kind: TotalsScope::User, id }
    }

    /// Resolve a scope from query values. Both parts are required.
    pub fn from_query(scope: Option<&str>, id: Option<DbId>) -> Result<Self, CoreError> {
        let kind = scope
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidArgument("scope is required (truck or user)".to_string())
            })
            .and_then(TotalsScope::parse)?;
        let id = require_id(id, kind)?;
        Ok(Self { kind, id })
    }
}

/// Require a scope identifier, naming the missing field in the error.
pub fn require_id(id: Option<DbId>, kind: TotalsScope) -> Result<DbId, CoreError> {
    id.ok_or_else(|| {
        let field = match kind {
            TotalsScope::Truck => "truck_id",
            TotalsScope::User => "user_id",
        };
        CoreError::InvalidArgument(format!("{field} is required"))
    })
}

// ---------------------------------------------------------------------------
// Sums and totals
// ---------------------------------------------------------------------------

/// Raw per-category sums for one scope and window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategorySums {
    pub fuel: f64,
    pub def: f64,
    pub other: f64,
    pub income: f64,
    pub loan: f64,
    /// Litres of fuel purchased, not money.
    pub fuel_litres: f64,
}

impl CategorySums {
    pub fn add(&mut self, category: ExpenseCategory, amount: f64) {
        match category {
            ExpenseCategory::Fuel => self.fuel += amount,
            ExpenseCategory::Def => self.def += amount,
            ExpenseCategory::Other => self.other += amount,
            ExpenseCategory::Income => self.income += amount,
            ExpenseCategory::Loan => self.loan += amount,
        }
    }

    pub fn get(&self, category: ExpenseCategory) -> f64 {
        match category {
            ExpenseCategory::Fuel => self.fuel,
            ExpenseCategory::Def => self.def,
            ExpenseCategory::Other => self.other,
            ExpenseCategory::Income => self.income,
            ExpenseCategory::Loan => self.loan,
        }
    }

    /// Fuel + DEF + other. Income and loans never enter this figure.
    pub fn grand_total(&self) -> f64 {
        self.fuel + self.def + self.other
    }
}

/// Common view over truck- and user-scoped totals.
pub trait Totals {
    fn fuel_total(&self) -> f64;
    fn def_total(&self) -> f64;
    fn other_total(&self) -> f64;
    fn income_total(&self) -> f64;

    fn grand_total(&self) -> f64 {
        self.fuel_total() + self.def_total() + self.other_total()
    }
}

/// Totals for a single truck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruckScopedTotals {
    pub fuel_total: f64,
    pub def_total: f64,
    pub other_total: f64,
    pub income_total: f64,
    pub grand_total: f64,
}

impl From<&CategorySums> for TruckScopedTotals {
    fn from(sums: &CategorySums) -> Self {
        Self {
            fuel_total: sums.fuel,
            def_total: sums.def,
            other_total: sums.other,
            income_total: sums.income,
            grand_total: sums.grand_total(),
        }
    }
}

impl Totals for TruckScopedTotals {
    fn fuel_total(&self) -> f64 {
        self.fuel_total
    }
    fn def_total(&self) -> f64 {
        self.def_total
    }
    fn other_total(&self) -> f64 {
        self.other_total
    }
    fn income_total(&self) -> f64 {
        self.income_total
    }
}

/// Current-calendar-month figures nested in user totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyExpenses {
    pub fuel_total: f64,
    pub def_total: f64,
    pub other_total: f64,
    pub income_total: f64,
    pub fuel_used_total: f64,
}

impl From<&CategorySums> for MonthlyExpenses {
    fn from(sums: &CategorySums) -> Self {
        Self {
            fuel_total: sums.fuel,
            def_total: sums.def,
            other_total: sums.other,
            income_total: sums.income,
            fuel_used_total: sums.fuel_litres,
        }
    }
}

/// Totals across everything a user owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserScopedTotals {
    pub fuel_total: f64,
    pub def_total: f64,
    pub other_total: f64,
    pub income_total: f64,
    pub grand_total: f64,
    pub fuel_used_total: f64,
    pub monthly_expenses: MonthlyExpenses,
    pub monthly_grand_total: f64,
}

impl UserScopedTotals {
    /// Merge the requested-window sums with the current-month sums.
    pub fn new(window: &CategorySums, current_month: &CategorySums) -> Self {
        Self {
            fuel_total: window.fuel,
            def_total: window.def,
            other_total: window.other,
            income_total: window.income,
            grand_total: window.grand_total(),
            fuel_used_total: window.fuel_litres,
            monthly_expenses: MonthlyExpenses::from(current_month),
            monthly_grand_total: current_month.grand_total(),
        }
    }
}

impl Totals for UserScopedTotals {
    fn fuel_total(&self) -> f64 {
        self.fuel_total
    }
    fn def_total(&self) -> f64 {
        self.def_total
    }
    fn other_total(&self) -> f64 {
        self.other_total
    }
    fn income_total(&self) -> f64 {
        self.income_total
    }
}

/// Totals for whichever scope the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ScopedTotals {
    Truck(TruckScopedTotals),
    User(UserScopedTotals),
}

impl Totals for ScopedTotals {
    fn fuel_total(&self) -> f64 {
        match self {
            ScopedTotals::Truck(t) => t.fuel_total(),
            ScopedTotals::User(u) => u.fuel_total(),
        }
    }
    fn def_total(&self) -> f64 {
        match self {
            ScopedTotals::Truck(t) => t.def_total(),
            ScopedTotals::User(u) => u.def_total(),
        }
    }
    fn other_total(&self) -> f64 {
        match self {
            ScopedTotals::Truck(t) => t.other_total(),
            ScopedTotals::User(u) => u.other_total(),
        }
    }
    fn income_total(&self) -> f64 {
        match self {
            ScopedTotals::Truck(t) => t.income_total(),
            ScopedTotals::User(u) => u.income_total(),
        }
    }
}

// ---------------------------------------------------------------------------
// Profit
// ---------------------------------------------------------------------------

/// Whether loan payments count as expenses when computing profit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfitLoanTreatment {
    #[default]
    Exclude,
    Include,
}

impl ProfitLoanTreatment {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(ProfitLoanTreatment::Exclude),
            "include" => Ok(ProfitLoanTreatment::Include),
            other => Err(CoreError::Validation(format!(
                "Invalid loan treatment '{other}'. Must be one of: exclude, include"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfitLoanTreatment::Exclude => "exclude",
            ProfitLoanTreatment::Include => "include",
        }
    }
}

/// Income minus expenses over one scope and window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub loan_total: f64,
    pub loans_included: bool,
    pub profit: f64,
}

impl ProfitSummary {
    pub fn compute(sums: &CategorySums, treatment: ProfitLoanTreatment) -> Self {
        let loans_included = treatment == ProfitLoanTreatment::Include;
        let total_expenses = if loans_included {
            sums.grand_total() + sums.loan
        } else {
            sums.grand_total()
        };
        Self {
            total_income: sums.income,
            total_expenses,
            loan_total: sums.loan,
            loans_included,
            profit: sums.income - total_expenses,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Account-level fleet figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMetrics {
    pub total_km: f64,
    pub total_trucks: i64,
    pub total_days: i64,
}

/// An odometer reading taken from fuel history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmReading {
    pub truck_id: DbId,
    pub date: Timestamp,
    pub current_km: f64,
}

/// Sum of each truck's most recent odometer reading.
///
/// Only the latest reading per truck counts; earlier readings are history,
/// not distance to add.
pub fn latest_km_total(readings: &[KmReading]) -> f64 {
    let mut latest: HashMap<DbId, KmReading> = HashMap::new();
    for reading in readings {
        latest
            .entry(reading.truck_id)
            .and_modify(|current| {
                if reading.date > current.date {
                    *current = *reading;
                }
            })
            .or_insert(*reading);
    }
    latest.values().map(|r| r.current_km).sum()
}

/// Days since the account was created, counting the creation day as day one.
pub fn total_days(created_at: Timestamp, now: Timestamp) -> i64 {
    (now - created_at).num_days().max(0) + 1
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

/// One `{month, category}` point of the expense trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpensePoint {
    pub month: &'static str,
    pub year: i32,
    pub category: &'static str,
    pub amount: f64,
}

/// One month of the income trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomePoint {
    pub month: &'static str,
    pub year: i32,
    pub amount: f64,
}

/// Trailing monthly trend series, oldest month first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub expenses_data: Vec<ExpensePoint>,
    pub income_data: Vec<IncomePoint>,
}

/// Lay out per-month sums as chart series in `months` order.
///
/// Months without any records contribute zero-valued points so every series
/// has the same length.
pub fn build_rollup(months: &[MonthKey], sums: &HashMap<MonthKey, CategorySums>) -> Rollup {
    let empty = CategorySums::default();
    let mut expenses_data = Vec::with_capacity(months.len() * ExpenseCategory::EXPENSES.len());
    let mut income_data = Vec::with_capacity(months.len());

    for month in months {
        let month_sums = sums.get(month).unwrap_or(&empty);
        for category in ExpenseCategory::EXPENSES {
            expenses_data.push(ExpensePoint {
                month: month.label(),
                year: month.year,
                category: category.label(),
                amount: month_sums.get(category),
            });
        }
        income_data.push(IncomePoint {
            month: month.label(),
            year: month.year,
            amount: month_sums.income,
        });
    }

    Rollup {
        expenses_data,
        income_data,
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// A flat row handed to the spreadsheet exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub date: Timestamp,
    pub category: String,
    pub amount: f64,
    pub note: Option<String>,
}

/// Label for an export row from its source table and optional other-expense
/// category code.
pub fn export_label(category: ExpenseCategory, other_code: Option<&str>) -> String {
    match category {
        ExpenseCategory::Other => OtherCategory::display_label(other_code),
        _ => category.label().to_string(),
    }
}

/// Order export rows by date, then category label.
pub fn sort_export_rows(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.category.cmp(&b.category)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::trailing_months;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sums(fuel: f64, def: f64, other: f64, income: f64, loan: f64) -> CategorySums {
        CategorySums {
            fuel,
            def,
            other,
            income,
            loan,
            fuel_litres: 0.0,
        }
    }

    // -- totals ----------------------------------------------------------------

    #[test]
    fn grand_total_excludes_income_and_loans() {
        let s = sums(120.5, 30.25, 49.25, 5000.0, 900.0);
        let totals = TruckScopedTotals::from(&s);
        assert_eq!(totals.grand_total, 200.0);
        assert_eq!(totals.grand_total, totals.fuel_total + totals.def_total + totals.other_total);
        assert_eq!(Totals::grand_total(&totals), totals.grand_total);
    }

    #[test]
    fn empty_sums_are_all_zero() {
        let totals = TruckScopedTotals::from(&CategorySums::default());
        assert_eq!(totals.fuel_total, 0.0);
        assert_eq!(totals.income_total, 0.0);
        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn user_totals_nest_current_month() {
        let mut window = sums(1000.0, 100.0, 50.0, 9000.0, 0.0);
        window.fuel_litres = 800.0;
        let month = sums(200.0, 20.0, 5.0, 1500.0, 0.0);
        let totals = UserScopedTotals::new(&window, &month);
        assert_eq!(totals.grand_total, 1150.0);
        assert_eq!(totals.fuel_used_total, 800.0);
        assert_eq!(totals.monthly_grand_total, 225.0);
        assert_eq!(totals.monthly_expenses.income_total, 1500.0);
    }

    #[test]
    fn scoped_totals_serialize_with_scope_tag() {
        let totals = ScopedTotals::Truck(TruckScopedTotals::from(&sums(1.0, 2.0, 3.0, 4.0, 0.0)));
        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(json["scope"], "truck");
        assert_eq!(json["grand_total"], 6.0);
        assert_eq!(totals.grand_total(), 6.0);
    }

    // -- scope -----------------------------------------------------------------

    #[test]
    fn missing_scope_id_is_invalid_argument() {
        assert_matches!(
            Scope::from_query(Some("truck"), None),
            Err(CoreError::InvalidArgument(msg)) if msg.contains("truck_id")
        );
        assert_matches!(Scope::from_query(None, Some(3)), Err(CoreError::InvalidArgument(_)));
        assert_matches!(
            Scope::from_query(Some("fleet"), Some(3)),
            Err(CoreError::InvalidArgument(_))
        );
        assert_eq!(Scope::from_query(Some("user"), Some(9)).unwrap(), Scope::user(9));
    }

    // -- profit ----------------------------------------------------------------

    #[test]
    fn profit_excludes_loans_by_default() {
        let s = sums(100.0, 10.0, 40.0, 1000.0, 300.0);
        let profit = ProfitSummary::compute(&s, ProfitLoanTreatment::default());
        assert_eq!(profit.total_expenses, 150.0);
        assert_eq!(profit.profit, 850.0);
        assert!(!profit.loans_included);
        assert_eq!(profit.loan_total, 300.0);
    }

    #[test]
    fn profit_includes_loans_when_configured() {
        let s = sums(100.0, 10.0, 40.0, 1000.0, 300.0);
        let profit = ProfitSummary::compute(&s, ProfitLoanTreatment::Include);
        assert_eq!(profit.total_expenses, 450.0);
        assert_eq!(profit.profit, 550.0);
        assert!(profit.loans_included);
    }

    #[test]
    fn loan_treatment_parses_case_insensitively() {
        assert_eq!(ProfitLoanTreatment::parse("Include").unwrap(), ProfitLoanTreatment::Include);
        assert_matches!(ProfitLoanTreatment::parse("sometimes"), Err(CoreError::Validation(_)));
    }

    // -- profile ---------------------------------------------------------------

    #[test]
    fn km_total_uses_latest_reading_per_truck() {
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 5, d, 12, 0, 0).unwrap();
        let readings = [
            KmReading { truck_id: 1, date: day(1), current_km: 100.0 },
            KmReading { truck_id: 1, date: day(10), current_km: 250.0 },
            KmReading { truck_id: 1, date: day(20), current_km: 400.0 },
            KmReading { truck_id: 2, date: day(3), current_km: 50.0 },
            KmReading { truck_id: 2, date: day(15), current_km: 300.0 },
        ];
        assert_eq!(latest_km_total(&readings), 700.0);
    }

    #[test]
    fn km_total_ignores_insertion_order() {
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 5, d, 12, 0, 0).unwrap();
        let readings = [
            KmReading { truck_id: 1, date: day(20), current_km: 400.0 },
            KmReading { truck_id: 1, date: day(1), current_km: 100.0 },
        ];
        assert_eq!(latest_km_total(&readings), 400.0);
        assert_eq!(latest_km_total(&[]), 0.0);
    }

    #[test]
    fn total_days_counts_creation_day() {
        let created = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap();
        assert_eq!(total_days(created, created), 1);
        assert_eq!(total_days(created, Utc.with_ymd_and_hms(2025, 6, 2, 17, 0, 0).unwrap()), 1);
        assert_eq!(total_days(created, Utc.with_ymd_and_hms(2025, 6, 11, 18, 0, 0).unwrap()), 11);
    }

    // -- rollup ----------------------------------------------------------------

    #[test]
    fn rollup_is_oldest_first_with_three_expense_points_per_month() {
        let months = trailing_months(NaiveDate::from_ymd_opt(2025, 8, 12).unwrap(), ROLLUP_MONTHS);
        let mut by_month = HashMap::new();
        by_month.insert(MonthKey { year: 2025, month: 7 }, sums(300.0, 20.0, 80.0, 2500.0, 0.0));

        let rollup = build_rollup(&months, &by_month);

        let income_months: Vec<_> = rollup.income_data.iter().map(|p| p.month).collect();
        assert_eq!(income_months, vec!["Mar", "Apr", "May", "Jun", "Jul", "Aug"]);
        assert_eq!(rollup.expenses_data.len(), 18);
        assert_eq!(rollup.expenses_data[0].category, "Fuel");
        assert_eq!(rollup.expenses_data[1].category, "DEF");
        assert_eq!(rollup.expenses_data[2].category, "Other");

        let july_total: f64 = rollup
            .expenses_data
            .iter()
            .filter(|p| p.month == "Jul")
            .map(|p| p.amount)
            .sum();
        assert_eq!(july_total, by_month[&MonthKey { year: 2025, month: 7 }].grand_total());
        assert_eq!(rollup.income_data[4].amount, 2500.0);
        assert_eq!(rollup.income_data[5].amount, 0.0);
    }

    // -- labels / export -------------------------------------------------------

    #[test]
    fn other_category_labels() {
        assert_eq!(OtherCategory::display_label(Some("tolls")), "Tolls");
        assert_eq!(OtherCategory::display_label(Some("truck_payment")), "Truck Payment");
        assert_eq!(OtherCategory::display_label(Some("custom_code")), "custom_code");
        assert_eq!(OtherCategory::display_label(None), "Other");
    }

    #[test]
    fn export_labels_follow_source_table() {
        assert_eq!(export_label(ExpenseCategory::Def, None), "DEF");
        assert_eq!(export_label(ExpenseCategory::Other, Some("wash")), "Truck Wash");
        assert_eq!(export_label(ExpenseCategory::Income, Some("ignored")), "Income");
    }

    #[test]
    fn export_category_filter() {
        assert_eq!(ExpenseCategory::parse_filter(None).unwrap(), None);
        assert_eq!(ExpenseCategory::parse_filter(Some("all")).unwrap(), None);
        assert_eq!(
            ExpenseCategory::parse_filter(Some("def")).unwrap(),
            Some(ExpenseCategory::Def)
        );
        assert_matches!(
            ExpenseCategory::parse_filter(Some("tires")),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn export_rows_sort_by_date() {
        let at = |d: u32| Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap();
        let mut rows = vec![
            ExportRow { date: at(5), category: "Fuel".into(), amount: 1.0, note: None },
            ExportRow { date: at(2), category: "Income".into(), amount: 2.0, note: None },
            ExportRow { date: at(2), category: "DEF".into(), amount: 3.0, note: None },
        ];
        sort_export_rows(&mut rows);
        let order: Vec<_> = rows.iter().map(|r| r.amount).collect();
        assert_eq!(order, vec![3.0, 2.0, 1.0]);
    }
}
