//! Chat endpoint with SSE streaming.
//!
//! Each request gets its own relay task; the SSE body drains the task's
//! receiver. A client disconnect drops the receiver, which stops the task.

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppError;
use crate::types::ChatRequest;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.messages.is_empty() {
        return Err(AppError::BadRequest("No messages provided".to_string()));
    }

    let events = state.relay.run(req.messages);
    let stream = ReceiverStream::new(events).map(|event| Event::default().json_data(&event));

    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}
