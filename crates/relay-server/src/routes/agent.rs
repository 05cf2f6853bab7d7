//! Deployed agent details

use axum::{extract::State, routing::get, Json, Router};

use crate::types::AgentInfoResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/agent-info", get(agent_info))
}

async fn agent_info(State(state): State<AppState>) -> Json<AgentInfoResponse> {
    Json(AgentInfoResponse::from(state.agent.as_ref()))
}
