use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of an outbound call to the completion endpoint, the info service
/// or the DeepSeek API. Callers in the resolver treat every variant as a
/// reason to fall through to the next tier.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("upstream returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

impl BackendError {
    /// HTTP status carried by the error, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("attachment {0} not found")]
    AttachmentNotFound(usize),

    #[error("nothing to send or a reply is already in flight")]
    SendRejected,

    #[error("avatar rejected: {0}")]
    AvatarRejected(String),

    #[error("no avatar set")]
    NoAvatar,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_)
            | ApiError::AttachmentNotFound(_)
            | ApiError::NoAvatar => StatusCode::NOT_FOUND,
            ApiError::SendRejected => StatusCode::CONFLICT,
            ApiError::AvatarRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!("Client error: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        assert_eq!(BackendError::Timeout.to_string(), "request timed out");
        assert_eq!(
            BackendError::Status {
                status: 500,
                body: "boom".to_string()
            }
            .to_string(),
            "upstream returned status 500: boom"
        );
        assert_eq!(
            BackendError::EmptyReply.to_string(),
            "upstream returned an empty reply"
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::SessionNotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::SendRejected.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::AvatarRejected("too big".into())
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_status_only_for_status_variant() {
        let err = BackendError::Status {
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(BackendError::Malformed("x".into()).status(), None);
    }
}
