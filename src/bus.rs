use crate::chat::{Attachment, Message};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// A message was appended to a session log
    MessageAppended { session_id: String, message: Message },

    /// The typing indicator turned on or off
    TypingChanged { session_id: String, typing: bool },

    /// The pending attachment set changed
    AttachmentsChanged {
        session_id: String,
        pending: Vec<Attachment>,
    },

    /// The avatar image was replaced or cleared
    AvatarChanged {
        session_id: String,
        avatar: Option<Attachment>,
    },

    /// A message's `is_new` flag decayed
    MessageSettled {
        session_id: String,
        message_id: String,
    },

    /// The session was removed from the manager
    SessionClosed { session_id: String },
}

impl Event {
    pub fn session_id(&self) -> &str {
        match self {
            Event::MessageAppended { session_id, .. }
            | Event::TypingChanged { session_id, .. }
            | Event::AttachmentsChanged { session_id, .. }
            | Event::AvatarChanged { session_id, .. }
            | Event::MessageSettled { session_id, .. }
            | Event::SessionClosed { session_id } => session_id,
        }
    }
}

pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
