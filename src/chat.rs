use crate::handle::HandleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "You"),
            Sender::Ai => write!(f, "Brenin AI"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Display hint for freshly appended messages; cleared by `settle`.
    #[serde(default)]
    pub is_new: bool,
}

impl Message {
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            attachments,
            is_new: true,
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            attachments: Vec::new(),
            is_new: true,
        }
    }
}

/// Metadata of a file attached to a draft or a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub handle: HandleId,
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }
}

/// A file the user picked, before any policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCandidate {
    pub name: String,
    #[serde(default, alias = "type")]
    pub mime_type: String,
    #[serde(alias = "size")]
    pub size_bytes: u64,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            source: None,
        }
    }

    pub fn with_source(mut self, source: PathBuf) -> Self {
        self.source = Some(source);
        self
    }

    /// MIME type as recorded on the attachment; empty types become "unknown".
    pub fn recorded_mime(&self) -> String {
        if self.mime_type.trim().is_empty() {
            "unknown".to_string()
        } else {
            self.mime_type.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Text,
    Document,
    File,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.contains("pdf") {
            AttachmentKind::Pdf
        } else if mime.contains("text") {
            AttachmentKind::Text
        } else if mime.contains("document") {
            AttachmentKind::Document
        } else {
            AttachmentKind::File
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Pdf => "PDF document",
            AttachmentKind::Text => "text file",
            AttachmentKind::Document => "document",
            AttachmentKind::File => "file",
        }
    }
}

/// Limits applied when files are added to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub max_files: usize,
    pub max_bytes: u64,
    pub images_only: bool,
}

impl AttachmentPolicy {
    pub const GENERAL_MAX_BYTES: u64 = 10 * 1024 * 1024;
    pub const AVATAR_MAX_BYTES: u64 = 2 * 1024 * 1024;

    pub fn new(max_files: usize, max_bytes: u64) -> Self {
        Self {
            max_files,
            max_bytes,
            images_only: false,
        }
    }

    pub fn general() -> Self {
        Self::new(3, Self::GENERAL_MAX_BYTES)
    }

    pub fn avatar() -> Self {
        Self {
            max_files: 1,
            max_bytes: Self::AVATAR_MAX_BYTES,
            images_only: true,
        }
    }

    /// Whether a single file passes the size and type checks.
    pub fn admits(&self, file: &FileCandidate) -> bool {
        if file.size_bytes > self.max_bytes {
            return false;
        }
        !self.images_only || file.mime_type.starts_with("image/")
    }
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::general()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
