use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    provider: String,
    model: String,
}

/// Which backend and model this process is answering with
async fn handler(State(state): State<AppState>) -> Json<ModelInfo> {
    let provider = state.agent.provider();
    let kind = provider.kind();

    Json(ModelInfo {
        provider: kind.to_string(),
        model: format!("{} ({})", provider.model(), kind.vendor()),
    })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/model-info", get(handler))
        .with_state(state)
}
