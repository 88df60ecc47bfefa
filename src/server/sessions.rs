use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::bus::Event;
use crate::chat::FileCandidate;
use crate::driver::SessionDriver;
use crate::error::ApiError;
use crate::session::SessionSnapshot;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SendBody {
    #[serde(default)]
    pub text: String,
}

fn find(state: &AppState, id: &str) -> Result<SessionDriver, ApiError> {
    state
        .manager
        .get(id)
        .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))
}

pub async fn create(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let driver = state.manager.create_session();
    (StatusCode::CREATED, Json(json!({ "id": driver.id() })))
}

pub async fn list(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "sessions": state.manager.list() }))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(find(&state, &id)?.snapshot()))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.manager.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError> {
    let driver = find(&state, &id)?;
    // The reply cycle keeps running after we answer
    match driver.send(body.text) {
        Some(_cycle) => Ok((StatusCode::ACCEPTED, Json(driver.snapshot()))),
        None => Err(ApiError::SendRejected),
    }
}

pub async fn attach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(files): Json<Vec<FileCandidate>>,
) -> Result<impl IntoResponse, ApiError> {
    let driver = find(&state, &id)?;
    let accepted = driver.add_attachments(files);
    let pending = driver.snapshot().pending;
    Ok(Json(json!({ "accepted": accepted, "pending": pending })))
}

pub async fn detach(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<StatusCode, ApiError> {
    let driver = find(&state, &id)?;
    if driver.remove_attachment(index) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::AttachmentNotFound(index))
    }
}

pub async fn set_avatar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(file): Json<FileCandidate>,
) -> Result<impl IntoResponse, ApiError> {
    let driver = find(&state, &id)?;
    let name = file.name.clone();
    if driver.set_avatar(file) {
        Ok(Json(driver.snapshot()))
    } else {
        Err(ApiError::AvatarRejected(name))
    }
}

pub async fn clear_avatar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if find(&state, &id)?.clear_avatar() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NoAvatar)
    }
}

/// `GET /api/sessions/:id/events`: SSE feed of one session's bus events.
pub async fn events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::BoxError>>>, ApiError> {
    find(&state, &id)?;
    info!("New SSE subscriber for session {}", id);

    let manager = state.manager.clone();
    let mut rx = manager.event_bus().subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.session_id() == id => {
                    let closed = matches!(event, Event::SessionClosed { .. });
                    let name = event_name(&event);
                    match SseEvent::default().event(name).json_data(&event) {
                        Ok(sse) => {
                            yield Ok(sse);
                        }
                        Err(e) => warn!("Failed to encode event: {}", e),
                    }
                    if closed {
                        break;
                    }
                }
                Ok(_) => {
                    if manager.get(&id).is_none() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber for {} lagged by {} events", id, skipped);
                    if manager.get(&id).is_none() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("SSE stream for session {} ended", id);
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::MessageAppended { .. } => "message",
        Event::TypingChanged { .. } => "typing",
        Event::AttachmentsChanged { .. } => "attachments",
        Event::AvatarChanged { .. } => "avatar",
        Event::MessageSettled { .. } => "settled",
        Event::SessionClosed { .. } => "closed",
    }
}
