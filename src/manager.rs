use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;
use uuid::Uuid;

use crate::bus::{Event, EventBus};
use crate::chat::AttachmentPolicy;
use crate::driver::{SessionDriver, Timing};
use crate::handle::HandleTable;
use crate::resolver::ResponseResolver;
use crate::session::ChatSession;

/// Registry of live chat sessions. Sessions share the resolver, the event
/// bus and the handle table; each one owns its own log and handles.
pub struct SessionManager {
    resolver: Arc<ResponseResolver>,
    event_bus: Arc<EventBus>,
    handles: HandleTable,
    policy: AttachmentPolicy,
    timing: Timing,
    sessions: Mutex<HashMap<String, SessionDriver>>,
}

impl SessionManager {
    pub fn new(
        resolver: Arc<ResponseResolver>,
        event_bus: Arc<EventBus>,
        policy: AttachmentPolicy,
        timing: Timing,
    ) -> Self {
        Self {
            resolver,
            event_bus,
            handles: HandleTable::new(),
            policy,
            timing,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionDriver>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn create_session(&self) -> SessionDriver {
        let id = format!("ses_{}", Uuid::new_v4().simple());
        let session = ChatSession::new(
            id.clone(),
            self.policy,
            self.handles.clone(),
            self.event_bus.clone(),
        );
        let driver = SessionDriver::new(session, self.resolver.clone(), self.timing);

        self.sessions().insert(id.clone(), driver.clone());
        info!("Created chat session {}", id);
        driver
    }

    pub fn get(&self, id: &str) -> Option<SessionDriver> {
        self.sessions().get(id).cloned()
    }

    /// Forgets a session. Its handles are released once the last in-flight
    /// reply cycle holding it finishes.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions().remove(id).is_some();
        if removed {
            self.event_bus.publish(Event::SessionClosed {
                session_id: id.to_string(),
            });
            info!(
                "Removed chat session {} ({} handles live, {} of {} released)",
                id,
                self.handles.live_count(),
                self.handles.released_count(),
                self.handles.created_count()
            );
        }
        removed
    }

    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions().keys().cloned().collect();
        ids.sort();
        ids
    }
}
