//! Chat session state: the ordered message log, the draft, the pending
//! attachments and the awaiting-reply flag.
//!
//! `ChatSession` is a plain synchronous state machine. The async send cycle
//! lives in [`crate::driver`]; this type only decides what each mutation
//! does and publishes one bus event per mutation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::chat::{Attachment, AttachmentPolicy, FileCandidate, Message};
use crate::handle::{HandleTable, LocalHandle};

pub const GREETING: &str = "Hello! I'm Brenin AI. How can I assist you?";
pub const UPLOAD_PLACEHOLDER: &str = "Uploaded files";

/// What a committed submit hands to the resolver.
#[derive(Debug, Clone)]
pub struct Turn {
    pub utterance: String,
    pub attachments: Vec<Attachment>,
    pub message_id: String,
}

struct Held {
    attachment: Attachment,
    handle: LocalHandle,
}

impl Held {
    fn new(handles: &HandleTable, file: FileCandidate) -> Self {
        let mime_type = file.recorded_mime();
        let handle = handles.create(file.name.clone(), file.source);
        let attachment = Attachment {
            name: file.name,
            mime_type,
            size_bytes: file.size_bytes,
            handle: handle.id(),
        };
        Self { attachment, handle }
    }
}

/// Serializable view of a session for the HTTP API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub messages: Vec<Message>,
    pub draft: String,
    pub pending: Vec<Attachment>,
    pub avatar: Option<Attachment>,
    pub awaiting_reply: bool,
    pub can_send: bool,
}

pub struct ChatSession {
    id: String,
    messages: Vec<Message>,
    draft: String,
    pending: Vec<Held>,
    avatar: Option<Held>,
    /// Handles of attachments already handed off to sent messages.
    sent: Vec<LocalHandle>,
    awaiting_reply: bool,
    policy: AttachmentPolicy,
    handles: HandleTable,
    bus: Arc<EventBus>,
}

impl ChatSession {
    pub fn new(
        id: impl Into<String>,
        policy: AttachmentPolicy,
        handles: HandleTable,
        bus: Arc<EventBus>,
    ) -> Self {
        let mut greeting = Message::ai(GREETING);
        greeting.is_new = false;

        Self {
            id: id.into(),
            messages: vec![greeting],
            draft: String::new(),
            pending: Vec::new(),
            avatar: None,
            sent: Vec::new(),
            awaiting_reply: false,
            policy,
            handles,
            bus,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn pending_attachments(&self) -> Vec<Attachment> {
        self.pending.iter().map(|h| h.attachment.clone()).collect()
    }

    pub fn avatar(&self) -> Option<&Attachment> {
        self.avatar.as_ref().map(|h| &h.attachment)
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Whether the send control is enabled.
    pub fn can_send(&self) -> bool {
        !self.awaiting_reply && !(self.draft.trim().is_empty() && self.pending.is_empty())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            messages: self.messages.clone(),
            draft: self.draft.clone(),
            pending: self.pending_attachments(),
            avatar: self.avatar().cloned(),
            awaiting_reply: self.awaiting_reply,
            can_send: self.can_send(),
        }
    }

    /// Commits the current draft and pending attachments as a user message.
    /// Returns `None` without touching any state when there is nothing to
    /// send or a reply is already in flight.
    pub fn submit(&mut self) -> Option<Turn> {
        if !self.can_send() {
            debug!("Ignoring submit on session {}", self.id);
            return None;
        }

        let utterance = std::mem::take(&mut self.draft);
        let held = std::mem::take(&mut self.pending);

        let mut attachments = Vec::with_capacity(held.len());
        for Held { attachment, handle } in held {
            attachments.push(attachment);
            self.sent.push(handle);
        }

        let content = if utterance.trim().is_empty() {
            UPLOAD_PLACEHOLDER.to_string()
        } else {
            utterance.clone()
        };

        let message = Message::user(content, attachments.clone());
        let message_id = message.id.clone();
        self.push(message);

        if !attachments.is_empty() {
            self.publish_attachments();
        }

        self.awaiting_reply = true;
        self.bus.publish(Event::TypingChanged {
            session_id: self.id.clone(),
            typing: true,
        });

        Some(Turn {
            utterance,
            attachments,
            message_id,
        })
    }

    /// Appends the ai reply and ends the reply cycle.
    pub fn on_resolved(&mut self, reply: impl Into<String>) -> Option<&Message> {
        if !self.awaiting_reply {
            warn!("Session {} got a reply with no reply cycle in flight", self.id);
            return None;
        }

        self.awaiting_reply = false;
        self.push(Message::ai(reply));
        self.bus.publish(Event::TypingChanged {
            session_id: self.id.clone(),
            typing: false,
        });
        self.messages.last()
    }

    /// Adds files to the pending set, silently dropping oversized files and
    /// anything past the cap. Returns the number accepted.
    pub fn add_attachments<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        let mut accepted = 0;
        for file in files {
            if self.pending.len() >= self.policy.max_files {
                debug!("Dropping {}: attachment cap reached", file.name);
                continue;
            }
            if !self.policy.admits(&file) {
                debug!("Dropping {}: {} bytes over the limit", file.name, file.size_bytes);
                continue;
            }
            self.pending.push(Held::new(&self.handles, file));
            accepted += 1;
        }

        if accepted > 0 {
            self.publish_attachments();
        }
        accepted
    }

    pub fn remove_attachment(&mut self, index: usize) -> bool {
        if index >= self.pending.len() {
            return false;
        }
        let held = self.pending.remove(index);
        held.handle.release();
        self.publish_attachments();
        true
    }

    /// Replaces the avatar image. The previous avatar's handle is released
    /// right away. Returns false if the file is rejected by the avatar policy.
    pub fn set_avatar(&mut self, file: FileCandidate) -> bool {
        if !AttachmentPolicy::avatar().admits(&file) {
            debug!("Rejecting avatar {}", file.name);
            return false;
        }
        let next = Held::new(&self.handles, file);
        if let Some(previous) = self.avatar.replace(next) {
            previous.handle.release();
        }
        self.publish_avatar();
        true
    }

    pub fn clear_avatar(&mut self) -> bool {
        match self.avatar.take() {
            Some(previous) => {
                previous.handle.release();
                self.publish_avatar();
                true
            }
            None => false,
        }
    }

    /// Clears the `is_new` flag on a message.
    pub fn settle(&mut self, message_id: &str) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return false;
        };
        if !message.is_new {
            return false;
        }
        message.is_new = false;
        self.bus.publish(Event::MessageSettled {
            session_id: self.id.clone(),
            message_id: message_id.to_string(),
        });
        true
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.bus.publish(Event::MessageAppended {
            session_id: self.id.clone(),
            message,
        });
    }

    fn publish_attachments(&self) {
        self.bus.publish(Event::AttachmentsChanged {
            session_id: self.id.clone(),
            pending: self.pending_attachments(),
        });
    }

    fn publish_avatar(&self) {
        self.bus.publish(Event::AvatarChanged {
            session_id: self.id.clone(),
            avatar: self.avatar().cloned(),
        });
    }
}
