use axum::{body::Body, http::Request, Router};
use fontcard::{agent::Agent, providers::mock::MockProvider};
use http_body_util::BodyExt;
use std::sync::Arc;

use crate::state::AppState;

pub fn app(provider: Arc<MockProvider>) -> Router {
    let agent = Agent::new(provider, "system prompt");
    super::configure(AppState {
        agent: Arc::new(agent),
    })
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
