//! HTTP surface: the completion proxy, the canned info service and the
//! session API the widget talks to.

pub mod info;
pub mod proxy;
pub mod sessions;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::deepseek::DeepSeekClient;
use crate::manager::SessionManager;

pub struct AppState {
    pub manager: Arc<SessionManager>,
    /// `None` when no DeepSeek API key is configured.
    pub deepseek: Option<DeepSeekClient>,
    pub persona: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(info::health))
        .route("/api/deepseek", post(proxy::complete))
        .route("/api/sessions", post(sessions::create).get(sessions::list))
        .route(
            "/api/sessions/:id",
            get(sessions::show).delete(sessions::remove),
        )
        .route("/api/sessions/:id/messages", post(sessions::send))
        .route("/api/sessions/:id/attachments", post(sessions::attach))
        .route(
            "/api/sessions/:id/attachments/:index",
            delete(sessions::detach),
        )
        .route(
            "/api/sessions/:id/avatar",
            put(sessions::set_avatar).delete(sessions::clear_avatar),
        )
        .route("/api/sessions/:id/events", get(sessions::events))
        .merge(info::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::chat::{AttachmentPolicy, FileCandidate};
    use crate::driver::Timing;
    use crate::resolver::testing::{FakeCompletion, FakeInfo};
    use crate::resolver::ResponseResolver;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(deepseek: Option<DeepSeekClient>) -> Arc<AppState> {
        let resolver = Arc::new(ResponseResolver::new(
            Arc::new(FakeCompletion::answering("model reply")),
            Arc::new(FakeInfo::failing()),
            "persona",
        ));
        let timing = Timing {
            typing_delay: Duration::ZERO,
            reply_timeout: Duration::from_secs(5),
            new_flag_ttl: Duration::from_secs(60),
        };
        let manager = Arc::new(SessionManager::new(
            resolver,
            Arc::new(EventBus::new()),
            AttachmentPolicy::general(),
            timing,
        ));
        Arc::new(AppState {
            manager,
            deepseek,
            persona: "persona".into(),
        })
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(state(None)), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["server"], "Brenin Digital Human Backend");
    }

    #[tokio::test]
    async fn test_info_topics() {
        let (status, body) = call(router(state(None)), get_req("/api/weather")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["temperature"], 72);
        assert!(body["message"].as_str().unwrap().contains("72°F"));

        let (status, body) = call(router(state(None)), get_req("/api/brenin_projects")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active_development");
    }

    #[tokio::test]
    async fn test_proxy_without_key() {
        let (status, body) = call(
            router(state(None)),
            json_req("POST", "/api/deepseek", json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DeepSeek API key not configured");
    }

    #[tokio::test]
    async fn test_proxy_malformed_body_is_internal_error() {
        let client = DeepSeekClient::new(
            "sk-test".into(),
            "http://127.0.0.1:9/v1/chat/completions".into(),
            "deepseek-chat".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        let app = router(state(Some(client)));

        let (status, body) = call(
            app.clone(),
            json_req("POST", "/api/deepseek", json!({"context": "c"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let garbled = Request::post("/api/deepseek")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(app, garbled).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_proxy_forwards_and_maps_status() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello from DeepSeek"}}]
            })))
            .up_to_n_times(1)
            .mount(&upstream)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&upstream)
            .await;

        let client = DeepSeekClient::new(
            "sk-test".into(),
            format!("{}/v1/chat/completions", upstream.uri()),
            "deepseek-chat".into(),
            Duration::from_secs(2),
        )
        .unwrap();
        let app = router(state(Some(client)));

        let (status, body) = call(
            app.clone(),
            json_req("POST", "/api/deepseek", json!({"message": "hi", "context": "ctx"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hello from DeepSeek");

        let (status, body) = call(
            app,
            json_req("POST", "/api/deepseek", json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Failed to get response from DeepSeek");
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let state = state(None);
        let app = router(state.clone());

        let (status, body) = call(app.clone(), json_req("POST", "/api/sessions", json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            app.clone(),
            json_req(
                "POST",
                &format!("/api/sessions/{}/attachments", id),
                json!([
                    {"name": "a.txt", "type": "text/plain", "size": 10},
                    {"name": "huge.bin", "type": "", "size": 20 * 1024 * 1024}
                ]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], 1);

        let (status, _) = call(
            app.clone(),
            Request::delete(format!("/api/sessions/{}/attachments/4", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            app.clone(),
            Request::delete(format!("/api/sessions/{}/attachments/0", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.manager.handles().live_count(), 0);

        let (status, _) = call(
            app.clone(),
            json_req("POST", &format!("/api/sessions/{}/messages", id), json!({"text": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(
            app.clone(),
            json_req("POST", &format!("/api/sessions/{}/messages", id), json!({"text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["messages"][1]["content"], "hello");

        // Let the reply cycle land
        for _ in 0..50 {
            if !state.manager.get(&id).unwrap().snapshot().awaiting_reply {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let (status, body) = call(app.clone(), get_req(&format!("/api/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awaitingReply"], false);
        assert_eq!(body["messages"][2]["content"], "model reply");
        assert_eq!(body["messages"][2]["sender"], "ai");
    }

    #[tokio::test]
    async fn test_avatar_validation() {
        let state = state(None);
        let app = router(state.clone());
        let id = state.manager.create_session().id();

        let (status, _) = call(
            app.clone(),
            json_req(
                "PUT",
                &format!("/api/sessions/{}/avatar", id),
                json!({"name": "me.pdf", "type": "application/pdf", "size": 10}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = call(
            app.clone(),
            json_req(
                "PUT",
                &format!("/api/sessions/{}/avatar", id),
                json!({"name": "me.png", "type": "image/png", "size": 1024}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["avatar"]["name"], "me.png");

        let delete = || {
            Request::delete(format!("/api/sessions/{}/avatar", id))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = call(app.clone(), delete()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(app, delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(state.manager.handles().live_count(), 0);
    }

    #[tokio::test]
    async fn test_event_stream_ends_with_session() {
        let state = state(None);
        let app = router(state.clone());
        let driver = state.manager.create_session();
        let id = driver.id();

        let response = app
            .oneshot(get_req(&format!("/api/sessions/{}/events", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        driver.add_attachments(vec![FileCandidate::new("a.txt", "text/plain", 3)]);
        assert!(state.manager.remove(&id));

        let bytes = tokio::time::timeout(
            Duration::from_secs(2),
            axum::body::to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .expect("stream stays open after the session is removed")
        .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("event: attachments"));
        assert!(text.contains("event: closed"));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = router(state(None));
        let (status, body) = call(app.clone(), get_req("/api/sessions/ses_missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found: ses_missing");

        let (status, _) = call(
            app,
            json_req("POST", "/api/sessions/ses_missing/messages", json!({"text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
