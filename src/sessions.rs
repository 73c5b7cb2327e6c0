//! Work session lifecycle: `Active -> Stopped`, never reopened.

use crate::database::SqliteDatabase;
use crate::error::{Result, WorkPulseError};
use crate::events::EventNotifier;
use crate::models::{SessionStatus, UserContext, WorkSession};
use chrono::{DateTime, Utc};
use log::info;

#[derive(Clone, Debug)]
pub struct SessionStore {
    db: SqliteDatabase,
    events: EventNotifier,
}

impl SessionStore {
    pub fn new(db: SqliteDatabase, events: EventNotifier) -> Self {
        SessionStore { db, events }
    }

    /// Open a new session for the caller. A user may only have one active
    /// session; a start time in the future is rejected.
    pub fn start_session(
        &self,
        user: &UserContext,
        project_id: Option<String>,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<WorkSession> {
        let now = Utc::now();
        let start_time = start_time.unwrap_or(now);
        if start_time > now {
            return Err(WorkPulseError::validation(
                "Session start time cannot be in the future",
            ));
        }

        if self.db.find_active_session(&user.user_id)?.is_some() {
            return Err(WorkPulseError::conflict(
                "User already has an active session",
            ));
        }

        let session = WorkSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            organization_id: user.organization_id.clone(),
            project_id,
            start_time,
            end_time: None,
            total_active_seconds: 0,
            total_idle_seconds: 0,
            last_activity_at: None,
            status: SessionStatus::Active,
            version: 1,
        };
        // The partial unique index catches a concurrent start that slipped
        // past the check above.
        self.db.insert_session(&session)?;

        info!("Session {} started for user {}", session.id, user.user_id);
        self.events.user_online(&user.organization_id, &user.user_id);
        self.events.session_update(&session);
        Ok(session)
    }

    /// Stop the caller's session.
    pub fn stop_session(
        &self,
        session_id: &str,
        user: &UserContext,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<WorkSession> {
        let session = self.load_owned(session_id, user)?;
        if !session.is_active() {
            return Err(WorkPulseError::conflict("Session is already stopped"));
        }

        let now = Utc::now();
        let end_time = end_time.unwrap_or(now);
        if end_time > now {
            return Err(WorkPulseError::validation(
                "Session end time cannot be in the future",
            ));
        }
        if end_time < session.start_time {
            return Err(WorkPulseError::validation(
                "Session end time cannot be before its start time",
            ));
        }

        if !self.db.stop_session(session_id, end_time)? {
            return Err(WorkPulseError::conflict("Session is already stopped"));
        }

        let stopped = self.load(session_id)?;
        info!(
            "Session {} stopped for user {} ({}s active, {}s idle)",
            stopped.id, user.user_id, stopped.total_active_seconds, stopped.total_idle_seconds
        );
        self.events.session_update(&stopped);
        self.events.user_offline(&user.organization_id, &user.user_id);
        Ok(stopped)
    }

    pub fn get_active_session(&self, user: &UserContext) -> Result<Option<WorkSession>> {
        self.db.find_active_session(&user.user_id)
    }

    /// Session visible to its owner and to members of the same organization
    pub fn get_session(&self, session_id: &str, user: &UserContext) -> Result<WorkSession> {
        let session = self.load(session_id)?;
        if session.user_id != user.user_id && session.organization_id != user.organization_id {
            return Err(WorkPulseError::forbidden("Access denied to this session"));
        }
        Ok(session)
    }

    /// Delete one of the caller's sessions together with its activity logs
    pub fn delete_session(&self, session_id: &str, user: &UserContext) -> Result<()> {
        self.load_owned(session_id, user)?;
        if !self.db.delete_session(session_id)? {
            return Err(WorkPulseError::not_found(format!(
                "Session {} not found",
                session_id
            )));
        }
        info!("Session {} deleted by user {}", session_id, user.user_id);
        Ok(())
    }

    pub fn list_active_sessions(&self) -> Result<Vec<WorkSession>> {
        self.db.list_active_sessions()
    }

    pub fn list_sessions_started_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkSession>> {
        self.db.list_sessions_started_between(from, to)
    }

    fn load(&self, session_id: &str) -> Result<WorkSession> {
        self.db
            .find_session(session_id)?
            .ok_or_else(|| WorkPulseError::not_found(format!("Session {} not found", session_id)))
    }

    /// Load a session the caller owns
    pub(crate) fn load_owned(&self, session_id: &str, user: &UserContext) -> Result<WorkSession> {
        let session = self.load(session_id)?;
        ensure_owner(&session, user)?;
        Ok(session)
    }
}

pub(crate) fn ensure_owner(session: &WorkSession, user: &UserContext) -> Result<()> {
    if session.user_id != user.user_id || session.organization_id != user.organization_id {
        return Err(WorkPulseError::forbidden("Access denied to this session"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::events::{EventKind, MemoryTransport};
    use crate::retry::RetryConfig;
    use chrono::Duration;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SessionStore, Arc<MemoryTransport>) {
        let temp_dir = TempDir::new().unwrap();
        let db = SqliteDatabase::open(
            &temp_dir.path().join("sessions.db"),
            &DatabaseConfig::default(),
            RetryConfig::default(),
        )
        .unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let store = SessionStore::new(db, EventNotifier::new(transport.clone()));
        (temp_dir, store, transport)
    }

    fn alice() -> UserContext {
        UserContext::new("alice", "acme")
    }

    #[test]
    fn test_start_and_stop() {
        let (_dir, store, transport) = setup();
        let start = Utc::now() - Duration::hours(2);

        let session = store
            .start_session(&alice(), Some("proj".into()), Some(start))
            .unwrap();
        assert!(session.is_active());
        assert_eq!(session.total_tracked_seconds(), 0);
        assert_eq!(store.get_active_session(&alice()).unwrap().unwrap().id, session.id);

        let stopped = store.stop_session(&session.id, &alice(), None).unwrap();
        assert_eq!(stopped.status, SessionStatus::Stopped);
        assert!(stopped.end_time.is_some());
        assert!(store.get_active_session(&alice()).unwrap().is_none());

        assert_eq!(transport.named(EventKind::UserOnline).len(), 1);
        assert_eq!(transport.named(EventKind::UserOffline).len(), 1);
        assert_eq!(transport.named(EventKind::SessionUpdate).len(), 4);
    }

    #[test]
    fn test_second_start_conflicts() {
        let (_dir, store, _) = setup();
        store.start_session(&alice(), None, None).unwrap();
        let err = store.start_session(&alice(), None, None).unwrap_err();
        assert!(matches!(err, WorkPulseError::Conflict(_)));
    }

    #[test]
    fn test_future_start_rejected() {
        let (_dir, store, _) = setup();
        let err = store
            .start_session(&alice(), None, Some(Utc::now() + Duration::hours(1)))
            .unwrap_err();
        assert!(matches!(err, WorkPulseError::Validation(_)));
    }

    #[test]
    fn test_stop_errors() {
        let (_dir, store, _) = setup();
        let session = store
            .start_session(&alice(), None, Some(Utc::now() - Duration::hours(1)))
            .unwrap();

        let err = store.stop_session("missing", &alice(), None).unwrap_err();
        assert!(matches!(err, WorkPulseError::NotFound(_)));

        let bob = UserContext::new("bob", "acme");
        let err = store.stop_session(&session.id, &bob, None).unwrap_err();
        assert!(matches!(err, WorkPulseError::Forbidden(_)));

        let err = store
            .stop_session(
                &session.id,
                &alice(),
                Some(session.start_time - Duration::minutes(1)),
            )
            .unwrap_err();
        assert!(matches!(err, WorkPulseError::Validation(_)));

        store.stop_session(&session.id, &alice(), None).unwrap();
        let err = store.stop_session(&session.id, &alice(), None).unwrap_err();
        assert!(matches!(err, WorkPulseError::Conflict(_)));
    }

    #[test]
    fn test_get_session_visibility() {
        let (_dir, store, _) = setup();
        let session = store.start_session(&alice(), None, None).unwrap();

        let colleague = UserContext::new("bob", "acme");
        assert!(store.get_session(&session.id, &colleague).is_ok());

        let outsider = UserContext::new("eve", "other-org");
        let err = store.get_session(&session.id, &outsider).unwrap_err();
        assert!(matches!(err, WorkPulseError::Forbidden(_)));
    }

    #[test]
    fn test_delete_is_owner_only() {
        let (_dir, store, _) = setup();
        let session = store.start_session(&alice(), None, None).unwrap();

        let colleague = UserContext::new("bob", "acme");
        assert!(matches!(
            store.delete_session(&session.id, &colleague).unwrap_err(),
            WorkPulseError::Forbidden(_)
        ));

        store.delete_session(&session.id, &alice()).unwrap();
        assert!(matches!(
            store.get_session(&session.id, &alice()).unwrap_err(),
            WorkPulseError::NotFound(_)
        ));
    }
}
