//! Reading and resolving alerts raised by the detectors.

use crate::database::SqliteDatabase;
use crate::error::{Result, WorkPulseError};
use crate::models::{Alert, UserContext};
use chrono::Utc;
use log::info;

#[derive(Clone, Debug)]
pub struct AlertBook {
    db: SqliteDatabase,
}

impl AlertBook {
    pub fn new(db: SqliteDatabase) -> Self {
        AlertBook { db }
    }

    /// Unresolved alerts of the caller, oldest first
    pub fn list_open_alerts(&self, user: &UserContext) -> Result<Vec<Alert>> {
        self.db.list_open_alerts(&user.user_id)
    }

    /// Resolve one of the caller's alerts, which lets the detectors raise a
    /// new alert of that kind again.
    pub fn resolve_alert(&self, alert_id: &str, user: &UserContext) -> Result<Alert> {
        let alert = self
            .db
            .find_alert(alert_id)?
            .ok_or_else(|| WorkPulseError::not_found(format!("Alert {} not found", alert_id)))?;

        if alert.user_id != user.user_id {
            return Err(WorkPulseError::forbidden("Access denied to this alert"));
        }
        if !alert.is_open() {
            return Err(WorkPulseError::conflict("Alert is already resolved"));
        }

        let resolved_at = Utc::now();
        if !self.db.resolve_alert(alert_id, resolved_at)? {
            return Err(WorkPulseError::conflict("Alert is already resolved"));
        }

        info!("Alert {} resolved by user {}", alert_id, user.user_id);
        Ok(Alert {
            resolved_at: Some(resolved_at),
            ..alert
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::AlertType;
    use crate::retry::RetryConfig;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteDatabase, AlertBook) {
        let temp_dir = TempDir::new().unwrap();
        let db = SqliteDatabase::open(
            &temp_dir.path().join("alerts.db"),
            &DatabaseConfig::default(),
            RetryConfig::default(),
        )
        .unwrap();
        (temp_dir, db.clone(), AlertBook::new(db))
    }

    #[test]
    fn test_resolve_alert() {
        let (_dir, db, book) = setup();
        let user = UserContext::new("u1", "org-1");
        let alert = Alert::new("u1", AlertType::Idle, "idle".into(), Utc::now());
        db.insert_alert_unless_open(&alert, None).unwrap();

        assert_eq!(book.list_open_alerts(&user).unwrap().len(), 1);

        let stranger = UserContext::new("u2", "org-1");
        assert!(matches!(
            book.resolve_alert(&alert.id, &stranger).unwrap_err(),
            WorkPulseError::Forbidden(_)
        ));

        let resolved = book.resolve_alert(&alert.id, &user).unwrap();
        assert!(!resolved.is_open());
        assert!(book.list_open_alerts(&user).unwrap().is_empty());

        assert!(matches!(
            book.resolve_alert(&alert.id, &user).unwrap_err(),
            WorkPulseError::Conflict(_)
        ));
        assert!(matches!(
            book.resolve_alert("missing", &user).unwrap_err(),
            WorkPulseError::NotFound(_)
        ));
    }
}
