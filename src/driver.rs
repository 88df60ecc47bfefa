//! Async half of a chat session: commits sends, runs the resolver on a
//! spawned task and feeds the reply back into the session.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::chat::{Attachment, FileCandidate};
use crate::config::Config;
use crate::resolver::{Reply, ResponseResolver};
use crate::session::{ChatSession, SessionSnapshot};

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Minimum time the typing indicator stays on.
    pub typing_delay: Duration,
    /// Upper bound for one reply cycle.
    pub reply_timeout: Duration,
    /// How long a new message keeps its `is_new` flag.
    pub new_flag_ttl: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(1000),
            reply_timeout: Duration::from_secs(20),
            new_flag_ttl: Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
pub struct SessionDriver {
    session: Arc<Mutex<ChatSession>>,
    resolver: Arc<ResponseResolver>,
    timing: Timing,
}

impl SessionDriver {
    pub fn new(session: ChatSession, resolver: Arc<ResponseResolver>, timing: Timing) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            resolver,
            timing,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> String {
        self.lock().id().to_string()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn add_attachments(&self, files: Vec<FileCandidate>) -> usize {
        self.lock().add_attachments(files)
    }

    pub fn remove_attachment(&self, index: usize) -> bool {
        self.lock().remove_attachment(index)
    }

    pub fn set_avatar(&self, file: FileCandidate) -> bool {
        self.lock().set_avatar(file)
    }

    pub fn clear_avatar(&self) -> bool {
        self.lock().clear_avatar()
    }

    /// Submits `text` together with the pending attachments. Returns the
    /// reply cycle's task, or `None` when the submit was a no-op.
    pub fn send(&self, text: impl Into<String>) -> Option<JoinHandle<()>> {
        let turn = {
            let mut session = self.lock();
            let previous = session.draft().to_string();
            session.set_draft(text);
            match session.submit() {
                Some(turn) => turn,
                None => {
                    if session.is_awaiting_reply() {
                        debug!("Session {} still awaiting a reply, send ignored", session.id());
                    }
                    session.set_draft(previous);
                    return None;
                }
            }
        };

        self.schedule_settle(turn.message_id.clone());

        let driver = self.clone();
        Some(task::spawn(async move {
            let started = Instant::now();
            let reply = driver.resolve(turn.utterance, turn.attachments).await;

            let remaining = driver.timing.typing_delay.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                time::sleep(remaining).await;
            }

            let message_id = {
                let mut session = driver.lock();
                session.on_resolved(reply.text).map(|m| m.id.clone())
            };
            if let Some(id) = message_id {
                driver.schedule_settle(id);
            }
        }))
    }

    async fn resolve(&self, utterance: String, attachments: Vec<Attachment>) -> Reply {
        let resolver = self.resolver.clone();
        let cycle = task::spawn(async move { resolver.resolve(&utterance, &attachments).await });
        let abort = cycle.abort_handle();

        match time::timeout(self.timing.reply_timeout, cycle).await {
            Ok(Ok(reply)) => {
                info!("Reply resolved via {:?}", reply.tier);
                reply
            }
            Ok(Err(e)) => {
                error!("Reply task failed: {}", e);
                Reply::apology()
            }
            Err(_) => {
                warn!(
                    "Reply cycle exceeded {:?}, sending apology",
                    self.timing.reply_timeout
                );
                abort.abort();
                Reply::apology()
            }
        }
    }

    fn schedule_settle(&self, message_id: String) {
        let session = self.session.clone();
        let ttl = self.timing.new_flag_ttl;
        task::spawn(async move {
            time::sleep(ttl).await;
            session
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .settle(&message_id);
        });
    }
}

impl From<&Config> for Timing {
    fn from(config: &Config) -> Self {
        Self {
            typing_delay: config.typing_delay,
            reply_timeout: config.reply_timeout,
            new_flag_ttl: config.new_flag_ttl,
        }
    }
}
