//! Activity ingestion.
//!
//! Single activities are inserted and then folded into the session totals
//! through the [`ConcurrencyGuard`]. Bulk uploads are validated as a whole,
//! then inserted in one transaction that skips already-seen
//! `client_activity_id`s and applies the accumulated totals once.

use crate::database::{add_session_totals, insert_activity_log, InsertOutcome, SqliteDatabase};
use crate::error::{Result, WorkPulseError};
use crate::events::EventNotifier;
use crate::guard::ConcurrencyGuard;
use crate::models::{
    ActivityLog, ActivityUpdate, BulkActivityUpload, BulkUploadResult,
    LoggedActivity, TotalsDelta, UserContext, WorkSession,
};
use crate::sessions::ensure_owner;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct ActivityIngestor {
    db: SqliteDatabase,
    guard: ConcurrencyGuard,
    events: EventNotifier,
    max_bulk_activities: usize,
}

impl ActivityIngestor {
    pub fn new(
        db: SqliteDatabase,
        guard: ConcurrencyGuard,
        events: EventNotifier,
        max_bulk_activities: usize,
    ) -> Self {
        ActivityIngestor {
            db,
            guard,
            events,
            max_bulk_activities,
        }
    }

    /// Record one activity interval and add its duration to the session.
    pub fn log_activity(
        &self,
        session_id: &str,
        user: &UserContext,
        update: ActivityUpdate,
    ) -> Result<LoggedActivity> {
        validate_duration(update.duration_seconds)?;

        let session = self.load_writable(session_id, user)?;
        let now = Utc::now();
        let timestamp = update.timestamp.unwrap_or(now);
        validate_timestamp(&session, timestamp, now)?;

        let activity = ActivityLog {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp,
            activity_type: update.activity_type,
            duration_seconds: update.duration_seconds,
            url: update.url,
            client_activity_id: None,
        };
        self.db.insert_activity(&activity)?;

        let delta = TotalsDelta::for_activity(activity.activity_type, activity.duration_seconds);
        let updated = self.guard.update(&self.db, session_id, |current: &WorkSession| {
            if !current.is_active() {
                return Err(WorkPulseError::validation(
                    "Cannot log activity for a stopped session",
                ));
            }
            let mut next = current.clone();
            next.total_active_seconds += delta.active_seconds;
            next.total_idle_seconds += delta.idle_seconds;
            next.last_activity_at = Some(now);
            Ok(next)
        });

        let session = match updated {
            Ok(session) => session,
            Err(e) => {
                // Keep logs and totals consistent
                if let Err(cleanup) = self.db.delete_activity(&activity.id) {
                    warn!(
                        "Failed to remove activity {} after failed update: {}",
                        activity.id, cleanup
                    );
                }
                return Err(e);
            }
        };

        debug!(
            "Activity logged for session {}: {} ({}s)",
            session_id, activity.activity_type, activity.duration_seconds
        );
        self.events.session_update(&session);
        Ok(LoggedActivity { session, activity })
    }

    /// Upload a batch of activities. Every item is validated before
    /// anything is written; resubmitted items are counted as duplicates.
    pub fn bulk_upload_activities(
        &self,
        session_id: &str,
        user: &UserContext,
        upload: BulkActivityUpload,
    ) -> Result<BulkUploadResult> {
        let mut items = upload.activities;
        if items.len() > self.max_bulk_activities {
            return Err(WorkPulseError::validation(format!(
                "Batch of {} activities exceeds the limit of {}",
                items.len(),
                self.max_bulk_activities
            )));
        }

        let session = self.load_writable(session_id, user)?;
        if items.is_empty() {
            return Ok(BulkUploadResult {
                session,
                uploaded: 0,
                duplicates: 0,
            });
        }

        items.sort_by_key(|item| item.timestamp);

        let now = Utc::now();
        for item in &items {
            if item.client_activity_id.trim().is_empty() {
                return Err(WorkPulseError::validation(
                    "Bulk activities require a client_activity_id",
                ));
            }
            validate_duration(item.duration_seconds)?;
            validate_timestamp(&session, item.timestamp, now)?;
        }

        let (uploaded, duplicates) = self.db.with_transaction(|tx| {
            let mut uploaded = 0;
            let mut duplicates = 0;
            let mut delta = TotalsDelta::default();

            for item in &items {
                let log = ActivityLog {
                    id: uuid::Uuid::new_v4().to_string(),
                    session_id: session_id.to_string(),
                    timestamp: item.timestamp,
                    activity_type: item.activity_type,
                    duration_seconds: item.duration_seconds,
                    url: item.url.clone(),
                    client_activity_id: Some(item.client_activity_id.clone()),
                };
                match insert_activity_log(tx, &log)? {
                    InsertOutcome::Inserted => {
                        uploaded += 1;
                        delta.add(TotalsDelta::for_activity(
                            item.activity_type,
                            item.duration_seconds,
                        ));
                    }
                    InsertOutcome::Duplicate => {
                        duplicates += 1;
                        debug!("Duplicate activity skipped: {}", item.client_activity_id);
                    }
                }
            }

            if uploaded > 0 && add_session_totals(tx, session_id, delta, now)?.is_none() {
                return Err(WorkPulseError::validation(
                    "Cannot upload activities for a stopped session",
                ));
            }
            Ok((uploaded, duplicates))
        })?;

        let session = self.db.find_session(session_id)?.ok_or_else(|| {
            WorkPulseError::not_found(format!("Session {} not found", session_id))
        })?;

        info!(
            "Bulk upload completed for session {}: {} uploaded, {} duplicates",
            session_id, uploaded, duplicates
        );
        if uploaded > 0 {
            self.events.session_update(&session);
        }
        Ok(BulkUploadResult {
            session,
            uploaded,
            duplicates,
        })
    }

    /// Logs of one of the caller's sessions, oldest first. Bounds default to
    /// the session's own interval.
    pub fn list_activities(
        &self,
        session_id: &str,
        user: &UserContext,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityLog>> {
        let session = self.load_owned(session_id, user)?;
        let from = from.unwrap_or(session.start_time);
        let to = to.unwrap_or_else(|| session.upper_bound(Utc::now()));
        if to < from {
            return Err(WorkPulseError::validation("Range end is before its start"));
        }
        self.db.activities_between(session_id, from, to)
    }

    fn load_owned(&self, session_id: &str, user: &UserContext) -> Result<WorkSession> {
        let session = self
            .db
            .find_session(session_id)?
            .ok_or_else(|| WorkPulseError::not_found(format!("Session {} not found", session_id)))?;
        ensure_owner(&session, user)?;
        Ok(session)
    }

    fn load_writable(&self, session_id: &str, user: &UserContext) -> Result<WorkSession> {
        let session = self.load_owned(session_id, user)?;
        if !session.is_active() {
            return Err(WorkPulseError::validation(
                "Cannot log activity for a stopped session",
            ));
        }
        Ok(session)
    }
}

fn validate_duration(duration_seconds: i64) -> Result<()> {
    if duration_seconds <= 0 {
        return Err(WorkPulseError::validation(format!(
            "Activity duration must be positive, got {}",
            duration_seconds
        )));
    }
    Ok(())
}

/// Timestamps must fall within `[start_time, min(now, end_time)]`.
fn validate_timestamp(
    session: &WorkSession,
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    if timestamp < session.start_time {
        return Err(WorkPulseError::validation(format!(
            "Activity timestamp {} cannot be before session start time",
            timestamp
        )));
    }
    if let Some(end) = session.end_time {
        if timestamp > end {
            return Err(WorkPulseError::validation(format!(
                "Activity timestamp {} cannot be after session end time",
                timestamp
            )));
        }
    }
    if timestamp > now {
        return Err(WorkPulseError::validation(format!(
            "Activity timestamp {} cannot be in the future",
            timestamp
        )));
    }
    Ok(())
}
