//! Tiered reply resolution.
//!
//! Attachments get a descriptive reply. Everything else goes to the remote
//! completion endpoint first; when that fails the local rule table answers,
//! handing a few categories over to the info service.

pub mod completion;
pub mod info;
pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chat::Attachment;
use crate::error::BackendError;

use self::info::InfoCategory;
use self::rules::Action;

pub const APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, utterance: &str, context: &str) -> Result<String, BackendError>;
}

#[async_trait]
pub trait InfoBackend: Send + Sync {
    async fn fetch(&self, category: InfoCategory) -> Result<String, BackendError>;
}

/// Which tier produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Attachments,
    Completion,
    InfoService,
    InfoFallback,
    Rules,
    Apology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub tier: Tier,
}

impl Reply {
    fn new(text: impl Into<String>, tier: Tier) -> Self {
        Self {
            text: text.into(),
            tier,
        }
    }

    pub fn apology() -> Self {
        Self::new(APOLOGY, Tier::Apology)
    }
}

pub struct ResponseResolver {
    completion: Arc<dyn CompletionBackend>,
    info: Arc<dyn InfoBackend>,
    system_context: String,
}

impl ResponseResolver {
    pub fn new(
        completion: Arc<dyn CompletionBackend>,
        info: Arc<dyn InfoBackend>,
        system_context: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            info,
            system_context: system_context.into(),
        }
    }

    /// Produces exactly one reply. Backend failures fall through to the
    /// next tier and are never returned to the caller.
    pub async fn resolve(&self, utterance: &str, attachments: &[Attachment]) -> Reply {
        if !attachments.is_empty() {
            return Reply::new(describe_attachments(attachments), Tier::Attachments);
        }

        match self.completion.complete(utterance, &self.system_context).await {
            Ok(text) => {
                debug!("Completion endpoint answered");
                return Reply::new(text, Tier::Completion);
            }
            Err(e) => warn!("Completion endpoint failed, using local rules: {}", e),
        }

        match rules::action_for(rules::classify(utterance)) {
            Action::Reply(text) => Reply::new(text, Tier::Rules),
            Action::Route(category) => self.from_info_service(category).await,
        }
    }

    async fn from_info_service(&self, category: InfoCategory) -> Reply {
        match self.info.fetch(category).await {
            Ok(text) => {
                info!("Info service answered for {}", category);
                Reply::new(text, Tier::InfoService)
            }
            Err(e) => {
                warn!("Info service failed for {}: {}", category, e);
                Reply::new(category.canned(), Tier::InfoFallback)
            }
        }
    }
}

fn describe_attachments(attachments: &[Attachment]) -> String {
    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    let kinds: Vec<&str> = attachments.iter().map(|a| a.kind().describe()).collect();

    format!(
        "I can see you've uploaded {} file(s): {}. These appear to be {}. While I can't directly process the file contents yet, I can help you with questions about file management, organization, or general information about these file types. What would you like to know?",
        attachments.len(),
        names.join(", "),
        kinds.join(", ")
    )
}
