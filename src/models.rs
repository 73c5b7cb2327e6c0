//! Data models for WorkPulse.
//!
//! Entities stored by the engine (sessions, activity logs, alerts, daily
//! summaries) and the request/response shapes of the public operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Already-authenticated caller identity.
///
/// Every operation takes this explicitly; the engine never resolves
/// identity on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub organization_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        UserContext {
            user_id: user_id.into(),
            organization_id: organization_id.into(),
        }
    }
}

/// Lifecycle state of a work session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Stopped => "stopped",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            "stopped" => Some(SessionStatus::Stopped),
            _ => None,
        }
    }
}

/// A bounded interval of tracked work time for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    pub project_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_active_seconds: i64,
    pub total_idle_seconds: i64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    /// Optimistic concurrency token, bumped by every write to the session
    pub version: i64,
}

impl WorkSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn total_tracked_seconds(&self) -> i64 {
        self.total_active_seconds + self.total_idle_seconds
    }

    /// Latest instant an activity may be stamped with.
    pub fn upper_bound(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.end_time {
            Some(end) if end < now => end,
            _ => now,
        }
    }
}

/// Classification of an activity interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Active,
    Idle,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Active => "active",
            ActivityType::Idle => "idle",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ActivityType::Active),
            "idle" => Some(ActivityType::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed interval reported by a client agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity_type: ActivityType,
    pub duration_seconds: i64,
    /// Application or URL label
    pub url: Option<String>,
    /// Client-side idempotency key, unique within a session
    pub client_activity_id: Option<String>,
}

/// Amount to add to a session's running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalsDelta {
    pub active_seconds: i64,
    pub idle_seconds: i64,
}

impl TotalsDelta {
    pub fn for_activity(activity_type: ActivityType, duration_seconds: i64) -> Self {
        match activity_type {
            ActivityType::Active => TotalsDelta {
                active_seconds: duration_seconds,
                idle_seconds: 0,
            },
            ActivityType::Idle => TotalsDelta {
                active_seconds: 0,
                idle_seconds: duration_seconds,
            },
        }
    }

    pub fn add(&mut self, other: TotalsDelta) {
        self.active_seconds += other.active_seconds;
        self.idle_seconds += other.idle_seconds;
    }

    pub fn is_zero(&self) -> bool {
        self.active_seconds == 0 && self.idle_seconds == 0
    }
}

/// Single activity submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub activity_type: ActivityType,
    pub duration_seconds: i64,
    #[serde(default)]
    pub url: Option<String>,
    /// Defaults to the time of ingestion
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One item of a bulk upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkActivityItem {
    pub client_activity_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity_type: ActivityType,
    pub duration_seconds: i64,
    #[serde(default)]
    pub url: Option<String>,
}

/// Bulk upload request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkActivityUpload {
    pub activities: Vec<BulkActivityItem>,
}

/// Result of `log_activity`.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedActivity {
    pub session: WorkSession,
    pub activity: ActivityLog,
}

/// Result of `bulk_upload_activities`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadResult {
    pub session: WorkSession,
    pub uploaded: usize,
    pub duplicates: usize,
}

/// Kinds of derived alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Idle,
    Overtime,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Idle => "idle",
            AlertType::Overtime => "overtime",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(AlertType::Idle),
            "overtime" => Some(AlertType::Overtime),
            _ => None,
        }
    }
}

/// Derived notification raised by a periodic detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub alert_type: AlertType,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(user_id: &str, alert_type: AlertType, message: String, now: DateTime<Utc>) -> Self {
        Alert {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            alert_type,
            message,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Per-application slice of a daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsage {
    pub app: String,
    pub total_seconds: i64,
    pub active_seconds: i64,
    pub idle_seconds: i64,
}

/// Per-user, per-day rollup. Exactly one row per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub total_work_seconds: i64,
    pub active_seconds: i64,
    pub idle_seconds: i64,
    /// 0-100, two decimal places
    pub productivity_score: f64,
    /// Sorted descending by total seconds
    pub app_usage: Vec<AppUsage>,
}
