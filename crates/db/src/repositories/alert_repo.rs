//! Repository for the `alerts` table.
//!
//! Every read except [`AlertRepo::find_by_id_include_inactive`] is limited to
//! active rows, so soft-deleted alerts never reach listings or counters.

use chrono::{Datelike, Duration};
use sqlx::PgPool;
use fleetledger_core::alert::{
    next_occurrence, plan_roll_forward, AlertSort, RollForwardStep, UPCOMING_SUMMARY_LIMIT,
};
use fleetledger_core::error::CoreError;
use fleetledger_core::types::{DbId, Timestamp};
use fleetledger_core::window::start_of_day;

use crate::models::alert::{
    Alert, AlertChanges, AlertCountsRow, AlertListFilter, AlertWithRefs, KeyCountRow, NewAlert,
    RollForwardOutcome,
};

/// Column list for alerts queries.
const COLUMNS: &str = "id, user_id, title, description, alert_date, alert_type, priority, \
    is_read, is_active, truck_id, driver_id, is_recurring, recurring_type, \
    recurring_day_of_month, last_recurred_date, parent_alert_id, created_at, updated_at";

/// Alert columns qualified with the `a` alias, plus the joined labels.
const COLUMNS_WITH_REFS: &str = "a.id, a.user_id, a.title, a.description, a.alert_date, \
    a.alert_type, a.priority, a.is_read, a.is_active, a.truck_id, a.driver_id, \
    a.is_recurring, a.recurring_type, a.recurring_day_of_month, a.last_recurred_date, \
    a.parent_alert_id, a.created_at, a.updated_at, \
    t.truck_number, d.name AS driver_name";

/// Joins resolving truck and driver labels. Dangling ids yield NULL labels.
const REF_JOINS: &str = "FROM alerts a \
    LEFT JOIN trucks t ON t.id = a.truck_id \
    LEFT JOIN drivers d ON d.id = a.driver_id";

/// Listing predicate shared by `list` and `count`. Binds `$1..$8`.
const LIST_WHERE: &str = "WHERE a.user_id = $1 AND a.is_active = TRUE \
    AND ($2::boolean IS NULL OR a.is_read = $2) \
    AND ($3::text IS NULL OR a.alert_type = $3) \
    AND ($4::text IS NULL OR a.priority = $4) \
    AND ($5::timestamptz IS NULL OR a.alert_date >= $5) \
    AND ($6::timestamptz IS NULL OR a.alert_date < $6) \
    AND ($7::timestamptz IS NULL OR a.alert_date <= $7) \
    AND (NOT $8 OR a.is_read = FALSE)";

/// Failure of a recurring roll-forward: either the alert is in the wrong
/// state or the database call failed.
#[derive(Debug, thiserror::Error)]
pub enum RollForwardError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides persistence for owner alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Insert a new unread, active alert.
    pub async fn create(pool: &PgPool, input: &NewAlert) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts
                (user_id, title, description, alert_date, alert_type, priority,
                 truck_id, driver_id, is_recurring, recurring_type, recurring_day_of_month)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(input.user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.alert_date)
            .bind(&input.alert_type)
            .bind(&input.priority)
            .bind(input.truck_id)
            .bind(input.driver_id)
            .bind(input.is_recurring)
            .bind(&input.recurring_type)
            .bind(input.recurring_day_of_month)
            .fetch_one(pool)
            .await
    }

    /// Find an active alert by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an alert by id regardless of its soft-delete state.
    pub async fn find_by_id_include_inactive(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active alert with its truck and driver labels.
    pub async fn find_with_refs(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AlertWithRefs>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS_WITH_REFS} {REF_JOINS} WHERE a.id = $1 AND a.is_active = TRUE"
        );
        sqlx::query_as::<_, AlertWithRefs>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// One page of an owner's active alerts in the filter's sort order.
    pub async fn list(
        pool: &PgPool,
        filter: &AlertListFilter,
    ) -> Result<Vec<AlertWithRefs>, sqlx::Error> {
        // The inner select exposes unqualified column names so the whitelisted
        // ORDER BY expressions resolve without ambiguity.
        let query = format!(
            "SELECT * FROM (SELECT {COLUMNS_WITH_REFS} {REF_JOINS} {LIST_WHERE}) AS listed
             ORDER BY {}
             LIMIT $9 OFFSET $10",
            filter.sort.order_by_sql()
        );
        sqlx::query_as::<_, AlertWithRefs>(&query)
            .bind(filter.user_id)
            .bind(filter.is_read)
            .bind(&filter.alert_type)
            .bind(&filter.priority)
            .bind(filter.bounds.from)
            .bind(filter.bounds.before)
            .bind(filter.bounds.until)
            .bind(filter.bounds.unread_only)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Number of alerts matching a listing filter, ignoring pagination.
    pub async fn count(pool: &PgPool, filter: &AlertListFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM alerts a {LIST_WHERE}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.user_id)
            .bind(filter.is_read)
            .bind(&filter.alert_type)
            .bind(&filter.priority)
            .bind(filter.bounds.from)
            .bind(filter.bounds.before)
            .bind(filter.bounds.until)
            .bind(filter.bounds.unread_only)
            .fetch_one(pool)
            .await
    }

    /// Overwrite the editable fields of an active alert.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        changes: &AlertChanges,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET
                title = $2,
                description = $3,
                alert_date = $4,
                alert_type = $5,
                priority = $6,
                truck_id = $7,
                driver_id = $8,
                is_recurring = $9,
                recurring_type = $10,
                recurring_day_of_month = $11
             WHERE id = $1 AND is_active = TRUE
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.description)
            .bind(changes.alert_date)
            .bind(&changes.alert_type)
            .bind(&changes.priority)
            .bind(changes.truck_id)
            .bind(changes.driver_id)
            .bind(changes.is_recurring)
            .bind(&changes.recurring_type)
            .bind(changes.recurring_day_of_month)
            .fetch_optional(pool)
            .await
    }

    /// Set the read flag of an active alert. Repeating the call is harmless.
    ///
    /// Reading a recurring occurrence completes it through
    /// [`AlertRepo::roll_forward`], so the series keeps exactly one pending
    /// successor.
    pub async fn mark_read(
        pool: &PgPool,
        id: DbId,
        is_read: bool,
        now: Timestamp,
    ) -> Result<Option<Alert>, RollForwardError> {
        if is_read {
            let Some(current) = Self::find_by_id(pool, id).await? else {
                return Ok(None);
            };
            if current.is_recurring {
                let outcome = Self::roll_forward(pool, id, now).await?;
                return Ok(outcome.map(|o| o.closed));
            }
        }

        let query = format!(
            "UPDATE alerts SET is_read = $2
             WHERE id = $1 AND is_active = TRUE AND NOT ($2 AND is_recurring)
             RETURNING {COLUMNS}"
        );
        let alert = sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(is_read)
            .fetch_optional(pool)
            .await?;
        Ok(alert)
    }

    /// Mark every active unread one-off alert of an owner as read. Returns
    /// the number of alerts changed.
    ///
    /// Recurring occurrences stay pending; they close only through
    /// [`AlertRepo::roll_forward`].
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts SET is_read = TRUE
             WHERE user_id = $1 AND is_active = TRUE AND is_read = FALSE
               AND is_recurring = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Soft-delete an alert. Returns `true` if an active row was deactivated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE alerts SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a soft-deleted alert, returning it. `None` when there is no
    /// inactive row with this id.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET is_active = TRUE
             WHERE id = $1 AND is_active = FALSE
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete an alert in any state. Returns `true` if a row was
    /// removed. A successor pointing at it keeps existing with a NULL parent.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------

    /// Counters over an owner's active alerts relative to `now`.
    ///
    /// `due_today` counts every alert dated on the UTC day of `now`, read or
    /// not.
    pub async fn counts(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<AlertCountsRow, sqlx::Error> {
        let today = start_of_day(now.date_naive());
        sqlx::query_as::<_, AlertCountsRow>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_read = FALSE) AS unread,
                COUNT(*) FILTER (WHERE is_read = FALSE AND alert_date < $2) AS overdue,
                COUNT(*) FILTER (WHERE alert_date >= $3 AND alert_date < $4) AS due_today
             FROM alerts
             WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .bind(now)
        .bind(today)
        .bind(today + Duration::days(1))
        .fetch_one(pool)
        .await
    }

    /// Active alert counts grouped by `alert_type`. Types with no alerts are
    /// absent.
    pub async fn count_by_type(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<KeyCountRow>, sqlx::Error> {
        sqlx::query_as::<_, KeyCountRow>(
            "SELECT alert_type AS key, COUNT(*) AS count
             FROM alerts
             WHERE user_id = $1 AND is_active = TRUE
             GROUP BY alert_type",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Active alert counts grouped by `priority`. Priorities with no alerts
    /// are absent.
    pub async fn count_by_priority(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<KeyCountRow>, sqlx::Error> {
        sqlx::query_as::<_, KeyCountRow>(
            "SELECT priority AS key, COUNT(*) AS count
             FROM alerts
             WHERE user_id = $1 AND is_active = TRUE
             GROUP BY priority",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// The next unread alerts dated at or after `now`, soonest first. Equal
    /// dates follow the default listing tie-breakers.
    pub async fn upcoming(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<AlertWithRefs>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM (SELECT {COLUMNS_WITH_REFS} {REF_JOINS}
                 WHERE a.user_id = $1 AND a.is_active = TRUE AND a.is_read = FALSE
                   AND a.alert_date >= $2) AS upcoming
             ORDER BY {}
             LIMIT $3",
            AlertSort::default().order_by_sql()
        );
        sqlx::query_as::<_, AlertWithRefs>(&query)
            .bind(user_id)
            .bind(now)
            .bind(UPCOMING_SUMMARY_LIMIT)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Recurrence
    // -----------------------------------------------------------------------

    /// Mark a recurring occurrence done and make sure exactly one successor
    /// exists.
    ///
    /// Runs in one transaction holding a row lock on the occurrence, so
    /// concurrent calls for the same alert serialize. A partially applied
    /// earlier call is completed; a fully applied one is returned unchanged.
    /// Returns `None` when no active alert has this id.
    pub async fn roll_forward(
        pool: &PgPool,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<RollForwardOutcome>, RollForwardError> {
        let mut tx = pool.begin().await?;

        let lock_query =
            format!("SELECT {COLUMNS} FROM alerts WHERE id = $1 AND is_active = TRUE FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, Alert>(&lock_query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let successor_query = format!("SELECT {COLUMNS} FROM alerts WHERE parent_alert_id = $1");
        let existing = sqlx::query_as::<_, Alert>(&successor_query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let step = plan_roll_forward(
            current.is_recurring,
            &current.recurring_type,
            current.is_read,
            existing.is_some(),
        )?;

        let closed = match step {
            RollForwardStep::CloseAndSpawn | RollForwardStep::CloseOnly => {
                let close_query = format!(
                    "UPDATE alerts SET is_read = TRUE, last_recurred_date = $2
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, Alert>(&close_query)
                    .bind(id)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?
            }
            RollForwardStep::SpawnSuccessor | RollForwardStep::Noop => current,
        };

        let successor = match step {
            RollForwardStep::CloseAndSpawn | RollForwardStep::SpawnSuccessor => {
                Some(Self::insert_successor(&mut tx, &closed).await?)
            }
            RollForwardStep::CloseOnly | RollForwardStep::Noop => existing,
        };

        tx.commit().await?;

        tracing::debug!(alert_id = id, ?step, "Recurring roll-forward applied");
        Ok(Some(RollForwardOutcome {
            closed,
            successor,
            step,
        }))
    }

    /// Insert the next occurrence of `closed`. The unique index on
    /// `parent_alert_id` rejects a second successor.
    async fn insert_successor(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        closed: &Alert,
    ) -> Result<Alert, sqlx::Error> {
        let day = closed
            .recurring_day_of_month
            .map(|d| d.clamp(1, 31) as u32)
            .unwrap_or_else(|| closed.alert_date.day());
        let next_date = next_occurrence(closed.alert_date, day);

        let query = format!(
            "INSERT INTO alerts
                (user_id, title, description, alert_date, alert_type, priority,
                 truck_id, driver_id, is_recurring, recurring_type, recurring_day_of_month,
                 parent_alert_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(closed.user_id)
            .bind(&closed.title)
            .bind(&closed.description)
            .bind(next_date)
            .bind(&closed.alert_type)
            .bind(&closed.priority)
            .bind(closed.truck_id)
            .bind(closed.driver_id)
            .bind(closed.is_recurring)
            .bind(&closed.recurring_type)
            .bind(closed.recurring_day_of_month)
            .bind(closed.id)
            .fetch_one(&mut **tx)
            .await
    }
}
