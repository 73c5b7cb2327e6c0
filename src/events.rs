//! Best-effort real-time notifications.
//!
//! The notifier never reports delivery failures to its caller; they are
//! logged and dropped.

use crate::error::Result;
use crate::models::{Alert, AlertType, WorkSession};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Audience of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Organization(String),
    User(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Organization(id) => write!(f, "org:{}", id),
            Scope::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UserOnline,
    UserOffline,
    SessionUpdate,
    InactiveAlert,
    OvertimeAlert,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserOnline => "user:online",
            EventKind::UserOffline => "user:offline",
            EventKind::SessionUpdate => "session:update",
            EventKind::InactiveAlert => "alert:inactive",
            EventKind::OvertimeAlert => "alert:overtime",
        }
    }
}

/// Fan-out mechanism behind the notifier.
pub trait EventTransport: Send + Sync {
    fn publish(&self, scope: &Scope, event: EventKind, payload: &Value) -> Result<()>;
}

/// Writes every event to the log. Used by the CLI.
#[derive(Debug, Default)]
pub struct LogTransport;

impl EventTransport for LogTransport {
    fn publish(&self, scope: &Scope, event: EventKind, payload: &Value) -> Result<()> {
        info!("[{}] {} {}", scope, event.as_str(), payload);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEvent {
    pub scope: String,
    pub event: String,
    pub payload: Value,
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    events: Mutex<Vec<PublishedEvent>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events with the given wire name
    pub fn named(&self, event: EventKind) -> Vec<PublishedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event == event.as_str())
            .collect()
    }
}

impl EventTransport for MemoryTransport {
    fn publish(&self, scope: &Scope, event: EventKind, payload: &Value) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| crate::error::WorkPulseError::system("event buffer poisoned"))?;
        events.push(PublishedEvent {
            scope: scope.to_string(),
            event: event.as_str().to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct EventNotifier {
    transport: Option<Arc<dyn EventTransport>>,
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("enabled", &self.transport.is_some())
            .finish()
    }
}

impl EventNotifier {
    pub fn new(transport: Arc<dyn EventTransport>) -> Self {
        EventNotifier {
            transport: Some(transport),
        }
    }

    /// A notifier that drops everything
    pub fn disabled() -> Self {
        Self::default()
    }

    fn emit(&self, scope: Scope, event: EventKind, payload: &Value) {
        let Some(transport) = &self.transport else {
            return;
        };
        match transport.publish(&scope, event, payload) {
            Ok(()) => debug!("Emitted {} to {}", event.as_str(), scope),
            Err(e) => warn!("Failed to emit {} to {}: {}", event.as_str(), scope, e),
        }
    }

    pub fn user_online(&self, organization_id: &str, user_id: &str) {
        self.emit(
            Scope::Organization(organization_id.to_string()),
            EventKind::UserOnline,
            &json!({ "userId": user_id, "timestamp": Utc::now() }),
        );
    }

    pub fn user_offline(&self, organization_id: &str, user_id: &str) {
        self.emit(
            Scope::Organization(organization_id.to_string()),
            EventKind::UserOffline,
            &json!({ "userId": user_id, "timestamp": Utc::now() }),
        );
    }

    /// Sent to the session owner and their organization
    pub fn session_update(&self, session: &WorkSession) {
        let payload = match serde_json::to_value(session) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize session {}: {}", session.id, e);
                return;
            }
        };
        self.emit(
            Scope::User(session.user_id.clone()),
            EventKind::SessionUpdate,
            &payload,
        );
        self.emit(
            Scope::Organization(session.organization_id.clone()),
            EventKind::SessionUpdate,
            &payload,
        );
    }

    pub fn alert(&self, alert: &Alert, session_id: &str) {
        let event = match alert.alert_type {
            AlertType::Idle => EventKind::InactiveAlert,
            AlertType::Overtime => EventKind::OvertimeAlert,
        };
        self.emit(
            Scope::User(alert.user_id.clone()),
            event,
            &json!({
                "alertId": alert.id,
                "sessionId": session_id,
                "message": alert.message,
                "timestamp": alert.created_at,
            }),
        );
    }
}
