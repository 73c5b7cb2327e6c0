//! # WorkPulse
//!
//! Work session tracking engine: merges concurrent activity reports into
//! per-session totals without lost updates, ingests bulk batches
//! idempotently, and derives idle/overtime alerts and daily summaries on a
//! schedule.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use workpulse::{Config, Engine, EventNotifier, UserContext};
//! use workpulse::models::{ActivityType, ActivityUpdate};
//!
//! let engine = Engine::open(&Config::default(), EventNotifier::disabled())?;
//! let user = UserContext::new("user-1", "org-1");
//!
//! let session = engine.sessions.start_session(&user, None, None)?;
//! engine.activity.log_activity(
//!     &session.id,
//!     &user,
//!     ActivityUpdate {
//!         activity_type: ActivityType::Active,
//!         duration_seconds: 30,
//!         url: Some("editor".into()),
//!         timestamp: None,
//!     },
//! )?;
//! # Ok::<(), workpulse::WorkPulseError>(())
//! ```

pub mod activity;
pub mod alerts;
pub mod common;
/// Configuration management module for loading and saving settings
pub mod config;
/// SQLite store for sessions, activity, alerts and summaries
pub mod database;
pub mod error;
pub mod events;
/// Optimistic compare-and-swap updates
pub mod guard;
pub mod idle;
pub mod jobs;
/// Database schema migration system
pub mod migrations;
pub mod models;
pub mod overtime;
/// Retry logic with exponential backoff for transient failures
pub mod retry;
pub mod sessions;
pub mod summary;

pub use activity::ActivityIngestor;
pub use alerts::AlertBook;
pub use config::Config;
pub use database::SqliteDatabase;
pub use error::{Result, WorkPulseError};
pub use events::{EventNotifier, EventTransport, LogTransport, MemoryTransport};
pub use guard::ConcurrencyGuard;
pub use idle::{IdleDetector, IdleThresholds};
pub use jobs::{JobKind, JobOutcome, JobRunner, Scheduler};
pub use models::UserContext;
pub use overtime::OvertimeDetector;
pub use retry::RetryConfig;
pub use sessions::SessionStore;
pub use summary::SummaryAggregator;

use std::path::Path;

/// Every component wired to one database and one notifier.
#[derive(Clone, Debug)]
pub struct Engine {
    pub db: SqliteDatabase,
    pub sessions: SessionStore,
    pub activity: ActivityIngestor,
    pub alerts: AlertBook,
    pub idle: IdleDetector,
    pub overtime: OvertimeDetector,
    pub summary: SummaryAggregator,
    job_retry: RetryConfig,
}

impl Engine {
    /// Open the database named by `config` and build every component
    pub fn open(config: &Config, events: EventNotifier) -> Result<Self> {
        Self::open_at(&config.database.resolved_path(), config, events)
    }

    /// Same as [`Engine::open`] with an explicit database path
    pub fn open_at(db_path: &Path, config: &Config, events: EventNotifier) -> Result<Self> {
        let db = SqliteDatabase::open(
            db_path,
            &config.database,
            RetryConfig::from(&config.retry.db_ops),
        )?;
        Ok(Self::with_database(db, config, events))
    }

    pub fn with_database(db: SqliteDatabase, config: &Config, events: EventNotifier) -> Self {
        Engine {
            sessions: SessionStore::new(db.clone(), events.clone()),
            activity: ActivityIngestor::new(
                db.clone(),
                ConcurrencyGuard::from(&config.concurrency),
                events.clone(),
                config.tracking.max_bulk_activities,
            ),
            alerts: AlertBook::new(db.clone()),
            idle: IdleDetector::new(
                db.clone(),
                events.clone(),
                IdleThresholds::from(&config.tracking),
            ),
            overtime: OvertimeDetector::new(
                db.clone(),
                events,
                config.tracking.overtime_threshold_hours,
            ),
            summary: SummaryAggregator::new(db.clone()),
            job_retry: RetryConfig::from(&config.retry.jobs),
            db,
        }
    }

    /// Runner for the periodic jobs, using the configured job retry policy
    pub fn job_runner(&self) -> JobRunner {
        JobRunner::new(
            self.idle.clone(),
            self.overtime.clone(),
            self.summary.clone(),
            self.job_retry.clone(),
        )
    }
}
