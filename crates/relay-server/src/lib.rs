//! Relay Server
//!
//! HTTP front end for the chat relay: an SSE chat endpoint, agent details,
//! and a health probe. This is a library crate; the binary wires
//! configuration and deployment, then calls `start_server()`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::Method, http::Uri, middleware, routing::get, Json, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use relay_core::config::BasicAuthCredentials;
use relay_core::deploy::AgentHandle;
use relay_core::ChatRelay;

pub mod auth;
pub mod error;
pub mod routes;
pub mod types;

use error::AppError;
use types::HealthResponse;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Relay bound to the deployed agent
    pub relay: ChatRelay,
    /// Agent resolved at startup
    pub agent: Arc<AgentHandle>,
    /// Basic-auth credentials; `None` disables auth
    pub basic_auth: Option<Arc<BasicAuthCredentials>>,
}

impl AppState {
    pub fn new(
        relay: ChatRelay,
        agent: AgentHandle,
        basic_auth: Option<BasicAuthCredentials>,
    ) -> Self {
        Self {
            relay,
            agent: Arc::new(agent),
            basic_auth: basic_auth.map(Arc::new),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api = routes::api_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::basic_auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    if state.basic_auth.is_some() {
        tracing::info!("Basic auth enabled");
    }
    let app = build_router(state);

    tracing::info!("Relay server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use relay_core::ai::client::{EventStream, ResponsesBackend, ResponsesRequest};
    use relay_core::ai::BackendError;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Replays the same events for every round.
    struct CannedBackend {
        events: Vec<Value>,
    }

    #[async_trait]
    impl ResponsesBackend for CannedBackend {
        async fn stream_response(
            &self,
            _request: ResponsesRequest,
        ) -> Result<EventStream, BackendError> {
            let events: Vec<Result<Value, BackendError>> =
                self.events.iter().cloned().map(Ok).collect();
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    fn state(basic_auth: Option<BasicAuthCredentials>) -> AppState {
        let backend = Arc::new(CannedBackend {
            events: vec![
                json!({"type": "response.created", "response": {"id": "resp_1"}}),
                json!({"type": "response.output_text.done", "text": "Hello there"}),
                json!({"type": "response.completed", "response": {"output": []}}),
            ],
        });
        let agent = AgentHandle {
            id: "site-safety:3".to_string(),
            name: "site-safety".to_string(),
            version: "3".to_string(),
            description: Some("Agent created/updated by Foundry Agent Accelerator".to_string()),
        };
        AppState::new(ChatRelay::new(backend, "site-safety"), agent, basic_auth)
    }

    fn credentials() -> BasicAuthCredentials {
        BasicAuthCredentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn sse_payloads(body: &str) -> Vec<Value> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect()
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::post("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn chat_streams_completed_message_then_stream_end() {
        let app = build_router(state(None));
        let response = app
            .oneshot(chat_request(json!({"messages": [{"content": "hi"}]})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let body = body_text(response).await;
        assert_eq!(
            sse_payloads(&body),
            vec![
                json!({"type": "completed_message", "content": "Hello there"}),
                json!({"type": "stream_end"}),
            ]
        );
    }

    #[tokio::test]
    async fn chat_rejects_empty_conversation() {
        let app = build_router(state(None));
        let response = app
            .oneshot(chat_request(json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn agent_info_reports_deployed_agent() {
        let app = build_router(state(None));
        let response = app
            .oneshot(Request::get("/agent-info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "site-safety",
                "id": "site-safety:3",
                "version": "3",
                "description": "Agent created/updated by Foundry Agent Accelerator"
            })
        );
    }

    #[tokio::test]
    async fn basic_auth_guards_everything_but_health() {
        let app = build_router(state(Some(credentials())));

        let response = app
            .clone()
            .oneshot(Request::get("/agent-info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic");

        let response = app
            .clone()
            .oneshot(
                Request::get("/agent-info")
                    .header(header::AUTHORIZATION, "Basic YWRtaW46d3Jvbmc=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                Request::get("/agent-info")
                    .header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let app = build_router(state(None));
        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
