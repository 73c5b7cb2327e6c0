//! Periodic idle / inactivity detection over active sessions.

use crate::config::TrackingConfig;
use crate::database::SqliteDatabase;
use crate::error::Result;
use crate::events::EventNotifier;
use crate::models::{ActivityLog, ActivityType, Alert, AlertType, WorkSession};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdleRun {
    pub inspected: usize,
    pub alerts_created: usize,
}

/// Why a session deserves an idle alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    /// Nothing reported in the window and nothing for longer than the
    /// inactivity timeout
    Inactive,
    /// Only idle intervals in the window, summing to at least the threshold
    Idle { idle_seconds: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct IdleThresholds {
    pub idle_threshold: Duration,
    pub idle_window: Duration,
    pub inactivity_timeout: Duration,
}

impl From<&TrackingConfig> for IdleThresholds {
    fn from(config: &TrackingConfig) -> Self {
        IdleThresholds {
            idle_threshold: Duration::seconds(config.idle_threshold_seconds as i64),
            idle_window: Duration::seconds(config.idle_window_seconds as i64),
            inactivity_timeout: Duration::seconds(config.inactivity_timeout_seconds as i64),
        }
    }
}

/// Classify a session from the logs in its trailing window.
///
/// `last_seen` is the last time the session heard from its client (or its
/// start time if it never did).
pub fn classify(
    window_logs: &[ActivityLog],
    last_seen: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &IdleThresholds,
) -> Option<IdleVerdict> {
    if window_logs.is_empty() {
        if now - last_seen > thresholds.inactivity_timeout {
            return Some(IdleVerdict::Inactive);
        }
        return None;
    }

    if window_logs
        .iter()
        .any(|log| log.activity_type != ActivityType::Idle)
    {
        return None;
    }

    let idle_seconds: i64 = window_logs.iter().map(|log| log.duration_seconds).sum();
    if idle_seconds >= thresholds.idle_threshold.num_seconds() {
        Some(IdleVerdict::Idle { idle_seconds })
    } else {
        None
    }
}

pub fn alert_message(verdict: IdleVerdict, thresholds: &IdleThresholds) -> String {
    match verdict {
        IdleVerdict::Inactive => format!(
            "No activity received for more than {} minutes",
            thresholds.inactivity_timeout.num_minutes()
        ),
        IdleVerdict::Idle { idle_seconds } => {
            format!("You have been idle for {} minutes", idle_seconds / 60)
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdleDetector {
    db: SqliteDatabase,
    events: EventNotifier,
    thresholds: IdleThresholds,
}

impl IdleDetector {
    pub fn new(db: SqliteDatabase, events: EventNotifier, thresholds: IdleThresholds) -> Self {
        IdleDetector {
            db,
            events,
            thresholds,
        }
    }

    pub fn run(&self) -> Result<IdleRun> {
        self.run_at(Utc::now())
    }

    /// Inspect every active session as of `now`
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<IdleRun> {
        let sessions = self.db.list_active_sessions()?;
        let mut alerts_created = 0;

        for session in &sessions {
            if self.inspect(session, now)? {
                alerts_created += 1;
            }
        }

        info!(
            "Idle detection completed: {} sessions inspected, {} alerts created",
            sessions.len(),
            alerts_created
        );
        Ok(IdleRun {
            inspected: sessions.len(),
            alerts_created,
        })
    }

    fn inspect(&self, session: &WorkSession, now: DateTime<Utc>) -> Result<bool> {
        if self
            .db
            .find_open_alert(&session.user_id, AlertType::Idle, None)?
            .is_some()
        {
            return Ok(false);
        }

        let window_start = now - self.thresholds.idle_window;
        let logs = self.db.activities_between(&session.id, window_start, now)?;
        let last_seen = session.last_activity_at.unwrap_or(session.start_time);

        let Some(verdict) = classify(&logs, last_seen, now, &self.thresholds) else {
            return Ok(false);
        };

        let alert = Alert::new(
            &session.user_id,
            AlertType::Idle,
            alert_message(verdict, &self.thresholds),
            now,
        );
        match self.db.insert_alert_unless_open(&alert, None)? {
            Some(created) => {
                debug!(
                    "Idle alert created for user {}, session {}",
                    session.user_id, session.id
                );
                self.events.alert(&created, &session.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> IdleThresholds {
        IdleThresholds::from(&TrackingConfig::default())
    }

    fn log(activity_type: ActivityType, duration: i64, now: DateTime<Utc>) -> ActivityLog {
        ActivityLog {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: "s".into(),
            timestamp: now - Duration::minutes(1),
            activity_type,
            duration_seconds: duration,
            url: None,
            client_activity_id: None,
        }
    }

    #[test]
    fn test_all_idle_over_threshold() {
        let now = Utc::now();
        let logs = vec![
            log(ActivityType::Idle, 200, now),
            log(ActivityType::Idle, 110, now),
        ];
        assert_eq!(
            classify(&logs, now, now, &thresholds()),
            Some(IdleVerdict::Idle { idle_seconds: 310 })
        );
    }

    #[test]
    fn test_idle_threshold_is_inclusive() {
        let now = Utc::now();
        let logs = vec![log(ActivityType::Idle, 300, now)];
        assert!(classify(&logs, now, now, &thresholds()).is_some());
        let logs = vec![log(ActivityType::Idle, 299, now)];
        assert!(classify(&logs, now, now, &thresholds()).is_none());
    }

    #[test]
    fn test_any_active_log_means_no_alert() {
        let now = Utc::now();
        let logs = vec![
            log(ActivityType::Idle, 500, now),
            log(ActivityType::Active, 5, now),
        ];
        assert_eq!(classify(&logs, now, now, &thresholds()), None);
    }

    #[test]
    fn test_empty_window_uses_inactivity_timeout() {
        let now = Utc::now();
        let recent = now - Duration::minutes(20);
        let stale = now - Duration::minutes(31);
        assert_eq!(classify(&[], recent, now, &thresholds()), None);
        assert_eq!(
            classify(&[], stale, now, &thresholds()),
            Some(IdleVerdict::Inactive)
        );
    }

    #[test]
    fn test_messages() {
        let t = thresholds();
        assert_eq!(
            alert_message(IdleVerdict::Idle { idle_seconds: 359 }, &t),
            "You have been idle for 5 minutes"
        );
        assert_eq!(
            alert_message(IdleVerdict::Inactive, &t),
            "No activity received for more than 30 minutes"
        );
    }
}
