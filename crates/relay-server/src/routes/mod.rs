//! API routes

use axum::Router;

use crate::AppState;

mod agent;
mod chat;

/// Routes behind the optional basic-auth layer
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(chat::router())
        .merge(agent::router())
}
