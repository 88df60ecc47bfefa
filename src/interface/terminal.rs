use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::bus::{Event, EventBus};
use crate::chat::{format_file_size, FileCandidate, Sender};
use crate::driver::SessionDriver;
use crate::handle::HandleTable;

const HELP: &str = "\
These commands are supported:
  /attach <path>...  Attach files to the next message
  /files             List pending attachments
  /remove <n>        Remove pending attachment number n
  /avatar <path>     Set the avatar image
  /help              Display this text
  /quit              Leave the chat
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Attach(Vec<PathBuf>),
    Files,
    Remove(usize),
    Avatar(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();

        match name.as_str() {
            "attach" if !args.is_empty() => {
                Command::Attach(args.into_iter().map(PathBuf::from).collect())
            }
            "attach" => Command::Invalid("Usage: /attach <path>...".into()),
            "files" => Command::Files,
            "remove" => match args.first().and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n >= 1 => Command::Remove(n - 1),
                _ => Command::Invalid("Usage: /remove <n> (starting at 1)".into()),
            },
            "avatar" => match args.first() {
                Some(path) => Command::Avatar(PathBuf::from(path)),
                None => Command::Invalid("Usage: /avatar <path>".into()),
            },
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(format!("Unknown command: /{}", other)),
        }
    }
}

/// MIME type guessed from the file extension, empty when unknown.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_default()
}

pub async fn candidate_from_path(path: &Path) -> Result<FileCandidate> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(FileCandidate::new(name, guess_mime(path), metadata.len()).with_source(path.to_path_buf()))
}

fn render(event: &Event) -> Option<String> {
    match event {
        Event::TypingChanged { typing: true, .. } => Some("Brenin AI is typing...".to_string()),
        Event::MessageAppended { message, .. } if message.sender == Sender::Ai => {
            Some(format!("{}: {}", message.sender, message.content))
        }
        _ => None,
    }
}

/// Feeds one session's events to `emit` until the bus closes. Falling
/// behind the shared bus skips the lost events and keeps going.
async fn relay_events<F>(mut rx: broadcast::Receiver<Event>, session_id: String, mut emit: F)
where
    F: FnMut(String),
{
    loop {
        match rx.recv().await {
            Ok(event) if event.session_id() == session_id => {
                if let Some(line) = render(&event) {
                    emit(line);
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Terminal for {} lagged by {} events", session_id, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Event bus closed, terminal relay for {} stopped", session_id);
}

pub struct TerminalInterface {
    bus: Arc<EventBus>,
    driver: SessionDriver,
    handles: HandleTable,
}

impl TerminalInterface {
    pub fn new(bus: Arc<EventBus>, driver: SessionDriver, handles: HandleTable) -> Self {
        Self {
            bus,
            driver,
            handles,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting terminal chat for session {}", self.driver.id());

        for message in self.driver.snapshot().messages {
            println!("{}: {}", message.sender, message.content);
        }
        println!("(type /help for commands)");

        let bus_rx = self.bus.subscribe();
        tokio::spawn(relay_events(bus_rx, self.driver.id(), |line| {
            println!("{}", line)
        }));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            match Command::parse(&line) {
                Command::Quit => break,
                command => self.handle(command).await,
            }
        }

        debug!("Terminal input closed");
        Ok(())
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::Send(text) => {
                if self.driver.send(text).is_none() {
                    let snapshot = self.driver.snapshot();
                    if snapshot.awaiting_reply {
                        println!("Still waiting for the last reply.");
                    }
                }
            }
            Command::Attach(paths) => {
                let mut files = Vec::with_capacity(paths.len());
                for path in paths {
                    match candidate_from_path(&path).await {
                        Ok(file) => files.push(file),
                        Err(e) => println!("{:#}", e),
                    }
                }
                let offered = files.len();
                let accepted = self.driver.add_attachments(files);
                if accepted < offered {
                    println!("{} file(s) skipped (too large or too many).", offered - accepted);
                }
                self.print_files();
            }
            Command::Files => self.print_files(),
            Command::Remove(index) => {
                if !self.driver.remove_attachment(index) {
                    println!("No attachment number {}.", index + 1);
                }
                self.print_files();
            }
            Command::Avatar(path) => match candidate_from_path(&path).await {
                Ok(file) => {
                    if self.driver.set_avatar(file) {
                        println!("Avatar updated.");
                    } else {
                        println!("Avatar must be an image of at most 2 MB.");
                    }
                }
                Err(e) => println!("{:#}", e),
            },
            Command::Help => println!("{}", HELP),
            Command::Invalid(message) => println!("{}", message),
            Command::Quit => {}
        }
    }

    fn print_files(&self) {
        let pending = self.driver.snapshot().pending;
        if pending.is_empty() {
            println!("No pending attachments.");
            return;
        }
        for (i, attachment) in pending.iter().enumerate() {
            let location = self
                .handles
                .source(attachment.handle)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| attachment.handle.to_string());
            println!(
                "  {}. {} ({}, {}) {}",
                i + 1,
                attachment.name,
                attachment.kind().describe(),
                format_file_size(attachment.size_bytes),
                location
            );
        }
    }
}
