//! Daily rollups of sessions and activity logs, plus the report queries
//! that read them back.

use crate::common::{day_bounds, round2};
use crate::database::SqliteDatabase;
use crate::error::{Result, WorkPulseError};
use crate::models::{ActivityLog, ActivityType, AppUsage, DailySummary, UserContext, WorkSession};
use chrono::NaiveDate;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Maximum number of rows returned by a user report
pub const REPORT_LIMIT: usize = 30;

/// Label for activity logs without an application or URL
pub const UNKNOWN_APP: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryRun {
    /// Users summarized
    pub processed: usize,
    pub date: NaiveDate,
}

/// Share of tracked time that was active, 0-100 with two decimals
pub fn productivity_score(active_seconds: i64, idle_seconds: i64) -> f64 {
    let total = active_seconds + idle_seconds;
    if total <= 0 {
        return 0.0;
    }
    round2(active_seconds as f64 / total as f64 * 100.0)
}

/// Group logs by label, sorted by total time descending (ties by label)
pub fn app_usage(logs: &[ActivityLog]) -> Vec<AppUsage> {
    let mut by_app: HashMap<&str, AppUsage> = HashMap::new();

    for log in logs {
        let app = log
            .url
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(UNKNOWN_APP);
        let usage = by_app.entry(app).or_insert_with(|| AppUsage {
            app: app.to_string(),
            total_seconds: 0,
            active_seconds: 0,
            idle_seconds: 0,
        });
        usage.total_seconds += log.duration_seconds;
        match log.activity_type {
            ActivityType::Active => usage.active_seconds += log.duration_seconds,
            ActivityType::Idle => usage.idle_seconds += log.duration_seconds,
        }
    }

    let mut usage: Vec<AppUsage> = by_app.into_values().collect();
    usage.sort_by(|a, b| {
        b.total_seconds
            .cmp(&a.total_seconds)
            .then_with(|| a.app.cmp(&b.app))
    });
    usage
}

/// Fold one user's sessions and logs for a day into a summary row
pub fn summarize(
    user_id: &str,
    date: NaiveDate,
    sessions: &[WorkSession],
    logs: &[ActivityLog],
) -> Option<DailySummary> {
    let first = sessions.first()?;
    let active_seconds: i64 = sessions.iter().map(|s| s.total_active_seconds).sum();
    let idle_seconds: i64 = sessions.iter().map(|s| s.total_idle_seconds).sum();

    Some(DailySummary {
        id: uuid::Uuid::new_v4().to_string(),
        organization_id: first.organization_id.clone(),
        user_id: user_id.to_string(),
        date,
        total_work_seconds: active_seconds + idle_seconds,
        active_seconds,
        idle_seconds,
        productivity_score: productivity_score(active_seconds, idle_seconds),
        app_usage: app_usage(logs),
    })
}

#[derive(Clone, Debug)]
pub struct SummaryAggregator {
    db: SqliteDatabase,
}

impl SummaryAggregator {
    pub fn new(db: SqliteDatabase) -> Self {
        SummaryAggregator { db }
    }

    /// Recompute the summaries of every user with a session starting on
    /// `date`. Safe to run repeatedly or concurrently.
    pub fn run(&self, date: NaiveDate) -> Result<SummaryRun> {
        let (from, to) = day_bounds(date);
        let sessions = self.db.list_sessions_started_between(from, to)?;

        let mut by_user: BTreeMap<String, Vec<WorkSession>> = BTreeMap::new();
        for session in sessions {
            by_user
                .entry(session.user_id.clone())
                .or_default()
                .push(session);
        }

        let mut processed = 0;
        for (user_id, sessions) in &by_user {
            let logs = self
                .db
                .activities_for_user_sessions_started_between(user_id, from, to)?;
            if let Some(summary) = summarize(user_id, date, sessions, &logs) {
                self.db.upsert_daily_summary(&summary)?;
                debug!(
                    "Daily summary for user {} on {}: {}s active, {}s idle",
                    user_id, date, summary.active_seconds, summary.idle_seconds
                );
                processed += 1;
            }
        }

        info!(
            "Daily summary completed for {}: {} users processed",
            date, processed
        );
        Ok(SummaryRun { processed, date })
    }

    /// The caller's summary for `date`, if one has been computed
    pub fn get_daily_summary(
        &self,
        user: &UserContext,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>> {
        self.db.get_daily_summary(&user.user_id, date)
    }

    /// Up to 30 summaries for `user_id`, newest first. Users may only read
    /// their own report.
    pub fn get_user_report(
        &self,
        requester: &UserContext,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailySummary>> {
        if requester.user_id != user_id {
            return Err(WorkPulseError::forbidden(
                "You can only view your own reports",
            ));
        }
        validate_range(from, to)?;
        self.db
            .list_daily_summaries(user_id, from, to, REPORT_LIMIT)
    }

    /// Every summary in the requester's organization, newest date first.
    pub fn get_organization_report(
        &self,
        requester: &UserContext,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailySummary>> {
        validate_range(from, to)?;
        self.db
            .list_org_daily_summaries(&requester.organization_id, from, to)
    }
}

fn validate_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(WorkPulseError::validation("Range end is before its start"));
        }
    }
    Ok(())
}
