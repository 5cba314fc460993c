use crate::error::ApiError;
use crate::state::AppState;
use crate::stream::{forward, SseResponse, FRAME_BUFFER};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use fontcard::{
    errors::GENERIC_FAILURE_MESSAGE,
    models::message::{Message, Role},
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

const INVALID_MESSAGES: &str = "Invalid messages format";

// Types matching the incoming UI message JSON structure
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    #[serde(default)]
    parts: Vec<IncomingPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    tool_call_id: Option<String>,
    tool_name: Option<String>,
    state: Option<String>,
    input: Option<Value>,
    output: Option<Value>,
    error_text: Option<String>,
}

fn parse_messages(payload: Value) -> Result<Vec<IncomingMessage>, ApiError> {
    match payload {
        Value::Object(mut body) => match body.remove("messages") {
            Some(messages @ Value::Array(_)) => serde_json::from_value(messages).map_err(|e| {
                warn!(error = %e, "malformed message in chat request");
                ApiError::bad_request(INVALID_MESSAGES)
            }),
            _ => Err(ApiError::bad_request(INVALID_MESSAGES)),
        },
        _ => Err(ApiError::bad_request(INVALID_MESSAGES)),
    }
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    let mut messages = Vec::new();

    for msg in incoming {
        let role = match msg.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => {
                warn!("Unknown role: {}", msg.role);
                continue;
            }
        };

        let message = msg.parts.into_iter().fold(Message::new(role), append_part);
        if !message.is_empty() {
            messages.push(message);
        }
    }

    messages
}

fn append_part(message: Message, part: IncomingPart) -> Message {
    if part.kind == "text" {
        return match part.text {
            Some(text) => message.with_text(text),
            None => message,
        };
    }

    let name = match part.kind.strip_prefix("tool-") {
        Some(name) => name.to_string(),
        None if part.kind == "dynamic-tool" => part.tool_name.unwrap_or_default(),
        // step-start, reasoning, file, ... carry nothing the model needs
        None => return message,
    };
    let Some(id) = part.tool_call_id else {
        return message;
    };
    let input = part.input.unwrap_or_else(|| json!({}));

    // A call without an outcome belongs to an interrupted turn and is left out
    match part.state.as_deref() {
        Some("output-available") => message
            .with_tool_call(id.clone(), name.clone(), input)
            .with_tool_result(id, name, part.output.unwrap_or(Value::Null)),
        Some("output-error") => message
            .with_tool_call(id.clone(), name.clone(), input)
            .with_tool_result(
                id,
                name,
                json!({ "error": part.error_text.unwrap_or_default() }),
            ),
        _ => message,
    }
}

async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<SseResponse, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "rejected chat request body");
        ApiError::bad_request(INVALID_MESSAGES)
    })?;
    let messages = convert_messages(parse_messages(payload)?);

    let provider = state.agent.provider();
    info!(
        provider = %provider.kind(),
        model = provider.model(),
        messages = messages.len(),
        "chat request"
    );

    // Nothing is committed until the first step has been accepted by the backend
    let mut reply = state.agent.reply(messages);
    let first = match reply.next().await {
        Some(Ok(event)) => event,
        Some(Err(err)) => return Err(ApiError::internal(err.user_message())),
        None => return Err(ApiError::internal(GENERIC_FAILURE_MESSAGE)),
    };

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let events = stream::once(async move { Ok(first) }).chain(reply).boxed();
    tokio::spawn(forward(events, tx));

    Ok(SseResponse::new(ReceiverStream::new(rx)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
