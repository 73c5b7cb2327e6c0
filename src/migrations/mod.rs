//! Versioned schema migrations.
//!
//! Every migration runs in its own transaction together with the row that
//! records it in `schema_migrations`, so a crash leaves the schema at a
//! well-defined version.

use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, Result, Transaction};

/// Migration trait for database schema changes
pub trait Migration {
    /// Unique version number (must be sequential)
    fn version(&self) -> u32;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Apply the migration (forward)
    fn up(&self, tx: &Transaction) -> Result<()>;
}

/// Load all migration definitions, in order
pub fn all_migrations() -> Vec<Box<dyn Migration>> {
    vec![Box::new(InitialSchema), Box::new(AddAppUsageToDailySummaries)]
}

/// Latest schema version known to this build
pub fn latest_version() -> u32 {
    all_migrations()
        .iter()
        .map(|m| m.version())
        .max()
        .unwrap_or(0)
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT,
            execution_time_ms INTEGER
        )",
        [],
    )?;
    Ok(())
}

/// Get current schema version (0 for an empty database)
pub fn current_version(conn: &Connection) -> Result<u32> {
    ensure_migrations_table(conn)?;
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Run migrations up to and including `target`. Returns how many were applied.
pub fn migrate_to(conn: &mut Connection, target: u32) -> Result<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in all_migrations()
        .into_iter()
        .filter(|m| m.version() > current && m.version() <= target)
    {
        let start = std::time::Instant::now();
        let tx = conn.transaction()?;

        migration.up(&tx)?;

        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at, description, execution_time_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                migration.version(),
                Utc::now().to_rfc3339(),
                migration.description(),
                start.elapsed().as_millis() as i64,
            ],
        )?;

        tx.commit()?;
        info!(
            "Applied migration v{}: {}",
            migration.version(),
            migration.description()
        );
        applied += 1;
    }

    Ok(applied)
}

/// Run all pending migrations
pub fn run_pending(conn: &mut Connection) -> Result<usize> {
    migrate_to(conn, latest_version())
}

/// Migration 001: sessions, activity logs, alerts, daily summaries
pub struct InitialSchema;

impl Migration for InitialSchema {
    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &str {
        "Create work session, activity log, alert and daily summary tables"
    }

    fn up(&self, tx: &Transaction) -> Result<()> {
        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS work_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                organization_id TEXT NOT NULL,
                project_id TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                total_active_seconds INTEGER NOT NULL DEFAULT 0,
                total_idle_seconds INTEGER NOT NULL DEFAULT 0,
                last_activity_at TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                version INTEGER NOT NULL DEFAULT 1
            );

            -- At most one active session per user
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active
                ON work_sessions(user_id) WHERE status = 'active';
            CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON work_sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_status ON work_sessions(status);

            CREATE TABLE IF NOT EXISTS activity_logs (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES work_sessions(id) ON DELETE CASCADE,
                timestamp TEXT NOT NULL,
                activity_type TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL CHECK (duration_seconds > 0),
                url TEXT,
                client_activity_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_activity_session_time
                ON activity_logs(session_id, timestamp);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_client_id
                ON activity_logs(session_id, client_activity_id)
                WHERE client_activity_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL,
                resolved_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_user_type ON alerts(user_id, alert_type, resolved_at);

            CREATE TABLE IF NOT EXISTS daily_summaries (
                id TEXT PRIMARY KEY,
                organization_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                total_work_seconds INTEGER NOT NULL DEFAULT 0,
                active_seconds INTEGER NOT NULL DEFAULT 0,
                idle_seconds INTEGER NOT NULL DEFAULT 0,
                productivity_score REAL NOT NULL DEFAULT 0
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_summaries_user_date
                ON daily_summaries(user_id, date);
            "#,
        )
    }
}

/// Migration 002: per-application usage breakdown on daily summaries
pub struct AddAppUsageToDailySummaries;

impl Migration for AddAppUsageToDailySummaries {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &str {
        "Add app_usage column to daily_summaries"
    }

    fn up(&self, tx: &Transaction) -> Result<()> {
        tx.execute(
            "ALTER TABLE daily_summaries ADD COLUMN app_usage TEXT NOT NULL DEFAULT '[]'",
            [],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("m.db")).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 0);
        let applied = run_pending(&mut conn).unwrap();

        assert_eq!(applied, 2);
        assert_eq!(current_version(&conn).unwrap(), latest_version());
        assert!(column_names(&conn, "daily_summaries").contains(&"app_usage".to_string()));
    }

    #[test]
    fn test_upgrade_from_v1() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("m.db")).unwrap();

        migrate_to(&mut conn, 1).unwrap();
        assert!(!column_names(&conn, "daily_summaries").contains(&"app_usage".to_string()));

        conn.execute(
            "INSERT INTO daily_summaries (id, organization_id, user_id, date)
             VALUES ('d1', 'org', 'u1', '2024-03-01')",
            [],
        )
        .unwrap();

        assert_eq!(run_pending(&mut conn).unwrap(), 1);
        let usage: String = conn
            .query_row("SELECT app_usage FROM daily_summaries WHERE id = 'd1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(usage, "[]");
    }

    #[test]
    fn test_rerun_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("m.db")).unwrap();
        run_pending(&mut conn).unwrap();
        assert_eq!(run_pending(&mut conn).unwrap(), 0);
    }
}
