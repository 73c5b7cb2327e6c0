//! Periodic overtime checks.

use crate::common::start_of_day;
use crate::database::SqliteDatabase;
use crate::error::Result;
use crate::events::EventNotifier;
use crate::models::{Alert, AlertType, WorkSession};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OvertimeRun {
    /// Active sessions over the threshold
    pub inspected: usize,
    pub alerts_created: usize,
}

/// Tracked hours rounded to one decimal place
pub fn worked_hours(tracked_seconds: i64) -> f64 {
    (tracked_seconds as f64 / 3600.0 * 10.0).round() / 10.0
}

pub fn overtime_message(hours: f64, threshold_hours: f64) -> String {
    format!(
        "You have worked for {} hours, exceeding the {} hour threshold",
        hours, threshold_hours
    )
}

#[derive(Clone, Debug)]
pub struct OvertimeDetector {
    db: SqliteDatabase,
    events: EventNotifier,
    threshold_hours: f64,
}

impl OvertimeDetector {
    pub fn new(db: SqliteDatabase, events: EventNotifier, threshold_hours: f64) -> Self {
        OvertimeDetector {
            db,
            events,
            threshold_hours,
        }
    }

    fn threshold_seconds(&self) -> i64 {
        (self.threshold_hours * 3600.0).round() as i64
    }

    pub fn run(&self) -> Result<OvertimeRun> {
        self.run_at(Utc::now())
    }

    pub fn run_at(&self, now: DateTime<Utc>) -> Result<OvertimeRun> {
        let threshold = self.threshold_seconds();
        let over: Vec<WorkSession> = self
            .db
            .list_active_sessions()?
            .into_iter()
            .filter(|s| s.total_tracked_seconds() > threshold)
            .collect();

        // One open overtime alert per user per calendar day
        let today = start_of_day(&now);
        let mut alerts_created = 0;

        for session in &over {
            let message = overtime_message(
                worked_hours(session.total_tracked_seconds()),
                self.threshold_hours,
            );
            let alert = Alert::new(&session.user_id, AlertType::Overtime, message, now);

            if let Some(created) = self.db.insert_alert_unless_open(&alert, Some(today))? {
                debug!(
                    "Overtime alert created for user {}, session {}",
                    session.user_id, session.id
                );
                self.events.alert(&created, &session.id);
                alerts_created += 1;
            }
        }

        info!(
            "Overtime check completed: {} sessions over threshold, {} alerts created",
            over.len(),
            alerts_created
        );
        Ok(OvertimeRun {
            inspected: over.len(),
            alerts_created,
        })
    }
}
