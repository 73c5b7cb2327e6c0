//! SQLite store for sessions, activity logs, alerts and daily summaries.
//!
//! Connections come from an r2d2 pool in WAL mode so readers never block
//! writers. Session totals are only ever written through a version-checked
//! update; the schema enforces the uniqueness rules (one active session per
//! user, one client activity id per session, one summary per user and day).

use crate::common::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::config::DatabaseConfig;
use crate::error::{Result, WorkPulseError};
use crate::guard::VersionedStore;
use crate::migrations;
use crate::models::{
    ActivityLog, ActivityType, Alert, AlertType, AppUsage, DailySummary, SessionStatus,
    TotalsDelta, WorkSession,
};
use crate::retry::{retry_if_retryable, RetryConfig};
use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SESSION_COLUMNS: &str = "id, user_id, organization_id, project_id, start_time, end_time,
    total_active_seconds, total_idle_seconds, last_activity_at, status, version";

const ACTIVITY_COLUMNS: &str =
    "id, session_id, timestamp, activity_type, duration_seconds, url, client_activity_id";

const ALERT_COLUMNS: &str = "id, user_id, alert_type, message, created_at, resolved_at";

const SUMMARY_COLUMNS: &str = "id, organization_id, user_id, date, total_work_seconds,
    active_seconds, idle_seconds, productivity_score, app_usage";

type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Outcome of inserting an activity log that may carry an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A log with the same (session, client_activity_id) already exists
    Duplicate,
}

#[derive(Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
    pool: Arc<Pool<SqliteConnectionManager>>,
    retry: RetryConfig,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteDatabase {
    /// Open (or create) the database with explicit settings
    pub fn open(db_path: &Path, settings: &DatabaseConfig, retry: RetryConfig) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let busy_timeout_ms = settings.busy_timeout_ms;
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            // Enable WAL mode for concurrent access
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", busy_timeout_ms)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(settings.max_connections.max(1))
            .build(manager)?;

        {
            let mut conn = pool.get()?;
            let applied = migrations::run_pending(&mut conn)?;
            if applied > 0 {
                log::debug!("Database {} migrated ({} steps)", db_path.display(), applied);
            }
        }

        Ok(Self {
            path: db_path.to_path_buf(),
            pool: Arc::new(pool),
            retry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.connection()?;
        Ok(migrations::current_version(&conn)?)
    }

    pub fn connection(&self) -> Result<DbConnection> {
        retry_if_retryable(&self.retry, || Ok(self.pool.get()?))
    }

    /// Run `f` inside an immediate (write-locked) transaction. Any error
    /// rolls back everything `f` wrote.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ---- sessions ----

    /// Insert a new session. A second active session for the same user
    /// violates the partial unique index and surfaces as a Conflict.
    pub fn insert_session(&self, session: &WorkSession) -> Result<()> {
        let conn = self.connection()?;
        let result = conn.execute(
            "INSERT INTO work_sessions (id, user_id, organization_id, project_id, start_time, end_time,
                total_active_seconds, total_idle_seconds, last_activity_at, status, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                session.id,
                session.user_id,
                session.organization_id,
                session.project_id,
                format_timestamp(&session.start_time),
                session.end_time.as_ref().map(format_timestamp),
                session.total_active_seconds,
                session.total_idle_seconds,
                session.last_activity_at.as_ref().map(format_timestamp),
                session.status.as_str(),
                session.version,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(WorkPulseError::conflict(
                "User already has an active session",
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_session(&self, session_id: &str) -> Result<Option<WorkSession>> {
        let conn = self.connection()?;
        load_session(&conn, session_id)
    }

    pub fn find_active_session(&self, user_id: &str) -> Result<Option<WorkSession>> {
        let conn = self.connection()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {} FROM work_sessions WHERE user_id = ?1 AND status = 'active'",
                    SESSION_COLUMNS
                ),
                params![user_id],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Transition an active session to stopped. Returns false when the
    /// session was no longer active.
    pub fn stop_session(&self, session_id: &str, end_time: DateTime<Utc>) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE work_sessions
             SET status = 'stopped', end_time = ?2, version = version + 1
             WHERE id = ?1 AND status = 'active'",
            params![session_id, format_timestamp(&end_time)],
        )?;
        Ok(changed == 1)
    }

    /// Delete a session; its activity logs go with it.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn.execute("DELETE FROM work_sessions WHERE id = ?1", params![session_id])?;
        Ok(changed == 1)
    }

    pub fn list_active_sessions(&self) -> Result<Vec<WorkSession>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM work_sessions WHERE status = 'active' ORDER BY start_time",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map([], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Sessions whose start time falls in `[from, to)`
    pub fn list_sessions_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkSession>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM work_sessions
             WHERE start_time >= ?1 AND start_time < ?2
             ORDER BY user_id, start_time",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map(
                params![format_timestamp(&from), format_timestamp(&to)],
                row_to_session,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    // ---- activity logs ----

    pub fn insert_activity(&self, log: &ActivityLog) -> Result<InsertOutcome> {
        let conn = self.connection()?;
        insert_activity_log(&conn, log)
    }

    pub fn delete_activity(&self, activity_id: &str) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn.execute("DELETE FROM activity_logs WHERE id = ?1", params![activity_id])?;
        Ok(changed == 1)
    }

    /// Logs of one session with `from <= timestamp <= to`, oldest first
    pub fn activities_between(
        &self,
        session_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityLog>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM activity_logs
             WHERE session_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
             ORDER BY timestamp",
            ACTIVITY_COLUMNS
        ))?;
        let logs = stmt
            .query_map(
                params![session_id, format_timestamp(&from), format_timestamp(&to)],
                row_to_activity,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Every log belonging to the user's sessions that started in `[from, to)`
    pub fn activities_for_user_sessions_started_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ActivityLog>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.session_id, a.timestamp, a.activity_type, a.duration_seconds, a.url,
                    a.client_activity_id
             FROM activity_logs a
             JOIN work_sessions s ON s.id = a.session_id
             WHERE s.user_id = ?1 AND s.start_time >= ?2 AND s.start_time < ?3
             ORDER BY a.timestamp",
        )?;
        let logs = stmt
            .query_map(
                params![user_id, format_timestamp(&from), format_timestamp(&to)],
                row_to_activity,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    pub fn count_activities(&self, session_id: &str) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM activity_logs WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- alerts ----

    /// Unresolved alert of `alert_type` for the user, optionally only those
    /// created at or after `since`
    pub fn find_open_alert(
        &self,
        user_id: &str,
        alert_type: AlertType,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<Alert>> {
        let conn = self.connection()?;
        find_open_alert_on(&conn, user_id, alert_type, since)
    }

    /// Insert `alert` unless an unresolved alert of the same kind already
    /// exists for the user. Check and insert share one write transaction.
    pub fn insert_alert_unless_open(
        &self,
        alert: &Alert,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<Alert>> {
        self.with_transaction(|tx| {
            if find_open_alert_on(tx, &alert.user_id, alert.alert_type, since)?.is_some() {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO alerts (id, user_id, alert_type, message, created_at, resolved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    alert.id,
                    alert.user_id,
                    alert.alert_type.as_str(),
                    alert.message,
                    format_timestamp(&alert.created_at),
                    alert.resolved_at.as_ref().map(format_timestamp),
                ],
            )?;
            Ok(Some(alert.clone()))
        })
    }

    pub fn find_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        let conn = self.connection()?;
        let alert = conn
            .query_row(
                &format!("SELECT {} FROM alerts WHERE id = ?1", ALERT_COLUMNS),
                params![alert_id],
                row_to_alert,
            )
            .optional()?;
        Ok(alert)
    }

    /// Mark an alert resolved. Returns false if it was already resolved.
    pub fn resolve_alert(&self, alert_id: &str, resolved_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE alerts SET resolved_at = ?2 WHERE id = ?1 AND resolved_at IS NULL",
            params![alert_id, format_timestamp(&resolved_at)],
        )?;
        Ok(changed == 1)
    }

    pub fn list_open_alerts(&self, user_id: &str) -> Result<Vec<Alert>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts WHERE user_id = ?1 AND resolved_at IS NULL ORDER BY created_at",
            ALERT_COLUMNS
        ))?;
        let alerts = stmt
            .query_map(params![user_id], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    pub fn count_alerts(&self, user_id: &str, alert_type: AlertType) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM alerts WHERE user_id = ?1 AND alert_type = ?2",
            params![user_id, alert_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- daily summaries ----

    /// Insert or overwrite the (user, date) row. The row keeps its original id.
    pub fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()> {
        let conn = self.connection()?;
        let app_usage = serde_json::to_string(&summary.app_usage)?;
        conn.execute(
            "INSERT INTO daily_summaries (id, organization_id, user_id, date, total_work_seconds,
                active_seconds, idle_seconds, productivity_score, app_usage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(user_id, date) DO UPDATE SET
                organization_id = excluded.organization_id,
                total_work_seconds = excluded.total_work_seconds,
                active_seconds = excluded.active_seconds,
                idle_seconds = excluded.idle_seconds,
                productivity_score = excluded.productivity_score,
                app_usage = excluded.app_usage",
            params![
                summary.id,
                summary.organization_id,
                summary.user_id,
                format_date(&summary.date),
                summary.total_work_seconds,
                summary.active_seconds,
                summary.idle_seconds,
                summary.productivity_score,
                app_usage,
            ],
        )?;
        Ok(())
    }

    pub fn get_daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailySummary>> {
        let conn = self.connection()?;
        let summary = conn
            .query_row(
                &format!(
                    "SELECT {} FROM daily_summaries WHERE user_id = ?1 AND date = ?2",
                    SUMMARY_COLUMNS
                ),
                params![user_id, format_date(&date)],
                row_to_summary,
            )
            .optional()?;
        Ok(summary)
    }

    /// Summaries for a user within optional inclusive date bounds, newest first
    pub fn list_daily_summaries(
        &self,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<DailySummary>> {
        let conn = self.connection()?;
        let from = from.map(|d| format_date(&d)).unwrap_or_else(|| "0000-01-01".to_string());
        let to = to.map(|d| format_date(&d)).unwrap_or_else(|| "9999-12-31".to_string());
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_summaries
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date DESC LIMIT ?4",
            SUMMARY_COLUMNS
        ))?;
        let summaries = stmt
            .query_map(params![user_id, from, to, limit as i64], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    /// Summaries of every user in an organization within optional inclusive
    /// date bounds, newest date first, then by user
    pub fn list_org_daily_summaries(
        &self,
        organization_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailySummary>> {
        let conn = self.connection()?;
        let from = from.map(|d| format_date(&d)).unwrap_or_else(|| "0000-01-01".to_string());
        let to = to.map(|d| format_date(&d)).unwrap_or_else(|| "9999-12-31".to_string());
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_summaries
             WHERE organization_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date DESC, user_id ASC",
            SUMMARY_COLUMNS
        ))?;
        let summaries = stmt
            .query_map(params![organization_id, from, to], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    pub fn count_daily_summaries(&self, user_id: &str, date: NaiveDate) -> Result<i64> {
        let conn = self.connection()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM daily_summaries WHERE user_id = ?1 AND date = ?2",
            params![user_id, format_date(&date)],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl VersionedStore<WorkSession> for SqliteDatabase {
    fn load(&self, id: &str) -> Result<WorkSession> {
        self.find_session(id)?
            .ok_or_else(|| WorkPulseError::not_found(format!("Session {} not found", id)))
    }

    fn write_if_version(&self, next: &WorkSession, expected_version: i64) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE work_sessions
             SET total_active_seconds = ?1, total_idle_seconds = ?2, last_activity_at = ?3,
                 version = version + 1
             WHERE id = ?4 AND version = ?5 AND status = 'active'",
            params![
                next.total_active_seconds,
                next.total_idle_seconds,
                next.last_activity_at.as_ref().map(format_timestamp),
                next.id,
                expected_version,
            ],
        )?;
        Ok(changed == 1)
    }
}

// ---- statement helpers usable inside a transaction ----

pub fn load_session(conn: &Connection, session_id: &str) -> Result<Option<WorkSession>> {
    let session = conn
        .query_row(
            &format!("SELECT {} FROM work_sessions WHERE id = ?1", SESSION_COLUMNS),
            params![session_id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// Insert an activity log, reporting a duplicate idempotency key as
/// `InsertOutcome::Duplicate` instead of an error
pub fn insert_activity_log(conn: &Connection, log: &ActivityLog) -> Result<InsertOutcome> {
    let result = conn.execute(
        "INSERT INTO activity_logs (id, session_id, timestamp, activity_type, duration_seconds,
            url, client_activity_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            log.id,
            log.session_id,
            format_timestamp(&log.timestamp),
            log.activity_type.as_str(),
            log.duration_seconds,
            log.url,
            log.client_activity_id,
        ],
    );

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
        Err(e) => Err(e.into()),
    }
}

/// Add `delta` to an active session's totals and bump its version.
/// Returns the updated session, or None if the session is not active.
pub fn add_session_totals(
    conn: &Connection,
    session_id: &str,
    delta: TotalsDelta,
    at: DateTime<Utc>,
) -> Result<Option<WorkSession>> {
    let changed = conn.execute(
        "UPDATE work_sessions
         SET total_active_seconds = total_active_seconds + ?2,
             total_idle_seconds = total_idle_seconds + ?3,
             last_activity_at = ?4,
             version = version + 1
         WHERE id = ?1 AND status = 'active'",
        params![
            session_id,
            delta.active_seconds,
            delta.idle_seconds,
            format_timestamp(&at)
        ],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    load_session(conn, session_id)
}

fn find_open_alert_on(
    conn: &Connection,
    user_id: &str,
    alert_type: AlertType,
    since: Option<DateTime<Utc>>,
) -> Result<Option<Alert>> {
    let since = since
        .map(|ts| format_timestamp(&ts))
        .unwrap_or_default();
    let alert = conn
        .query_row(
            &format!(
                "SELECT {} FROM alerts
                 WHERE user_id = ?1 AND alert_type = ?2 AND resolved_at IS NULL AND created_at >= ?3
                 ORDER BY created_at LIMIT 1",
                ALERT_COLUMNS
            ),
            params![user_id, alert_type.as_str(), since],
            row_to_alert,
        )
        .optional()?;
    Ok(alert)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ---- row mapping ----

fn conversion_error(column: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("invalid {} value: {}", column, raw).into(),
    )
}

fn ts_column(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(column, &raw))
}

fn optional_ts_column(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(column, &raw)),
        None => Ok(None),
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<WorkSession> {
    let status: String = row.get("status")?;
    Ok(WorkSession {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        organization_id: row.get("organization_id")?,
        project_id: row.get("project_id")?,
        start_time: ts_column(row, "start_time")?,
        end_time: optional_ts_column(row, "end_time")?,
        total_active_seconds: row.get("total_active_seconds")?,
        total_idle_seconds: row.get("total_idle_seconds")?,
        last_activity_at: optional_ts_column(row, "last_activity_at")?,
        status: SessionStatus::from_db(&status).ok_or_else(|| conversion_error("status", &status))?,
        version: row.get("version")?,
    })
}

fn row_to_activity(row: &Row) -> rusqlite::Result<ActivityLog> {
    let activity_type: String = row.get("activity_type")?;
    Ok(ActivityLog {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        timestamp: ts_column(row, "timestamp")?,
        activity_type: ActivityType::from_db(&activity_type)
            .ok_or_else(|| conversion_error("activity_type", &activity_type))?,
        duration_seconds: row.get("duration_seconds")?,
        url: row.get("url")?,
        client_activity_id: row.get("client_activity_id")?,
    })
}

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let alert_type: String = row.get("alert_type")?;
    Ok(Alert {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        alert_type: AlertType::from_db(&alert_type)
            .ok_or_else(|| conversion_error("alert_type", &alert_type))?,
        message: row.get("message")?,
        created_at: ts_column(row, "created_at")?,
        resolved_at: optional_ts_column(row, "resolved_at")?,
    })
}

fn row_to_summary(row: &Row) -> rusqlite::Result<DailySummary> {
    let date: String = row.get("date")?;
    let app_usage: String = row.get("app_usage")?;
    let app_usage: Vec<AppUsage> =
        serde_json::from_str(&app_usage).map_err(|_| conversion_error("app_usage", &app_usage))?;
    Ok(DailySummary {
        id: row.get("id")?,
        organization_id: row.get("organization_id")?,
        user_id: row.get("user_id")?,
        date: parse_date(&date).ok_or_else(|| conversion_error("date", &date))?,
        total_work_seconds: row.get("total_work_seconds")?,
        active_seconds: row.get("active_seconds")?,
        idle_seconds: row.get("idle_seconds")?,
        productivity_score: row.get("productivity_score")?,
        app_usage,
    })
}
