use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::error;

use crate::resolver::completion::{CompletionRequest, CompletionResponse};

use super::AppState;

/// `POST /api/deepseek`: forwards one utterance to DeepSeek.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            error!("Rejected DeepSeek proxy request: {}", e.body_text());
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CompletionResponse::error("Internal server error")),
            );
        }
    };

    let Some(client) = state.deepseek.as_ref() else {
        error!("DeepSeek API key not found");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CompletionResponse::error("DeepSeek API key not configured")),
        );
    };

    let system = request
        .context
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(state.persona.as_str());

    match client.complete(system, &request.message).await {
        Ok(text) => (StatusCode::OK, Json(CompletionResponse::reply(text))),
        Err(e) => match e.status() {
            Some(status) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                Json(CompletionResponse::error("Failed to get response from DeepSeek")),
            ),
            None => {
                error!("DeepSeek proxy error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(CompletionResponse::error("Internal server error")),
                )
            }
        },
    }
}
