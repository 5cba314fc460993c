use reqwest::Response;
use serde_json::{json, Map, Value};

use crate::errors::ProviderError;
use crate::models::event::FinishReason;
use crate::models::model_message::{ModelContent, ModelMessage, ModelRole};
use crate::tool::Tool;

/// Convert flat model messages to the OpenAI chat completions message specification
pub fn messages_to_openai_spec(system: &str, messages: &[ModelMessage]) -> Vec<Value> {
    let mut messages_spec = vec![json!({
        "role": "system",
        "content": system
    })];

    for message in messages {
        match message.role {
            ModelRole::System | ModelRole::User => {
                let role = if message.role == ModelRole::System {
                    "system"
                } else {
                    "user"
                };
                messages_spec.push(json!({
                    "role": role,
                    "content": message.text().unwrap_or_default()
                }));
            }
            ModelRole::Assistant => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": message.text()
                });

                let tool_calls: Vec<Value> = message
                    .tool_calls()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.input.to_string(),
                            }
                        })
                    })
                    .collect();
                if !tool_calls.is_empty() {
                    converted["tool_calls"] = json!(tool_calls);
                }
                messages_spec.push(converted);
            }
            ModelRole::Tool => {
                for result in message.tool_results() {
                    messages_spec.push(json!({
                        "role": "tool",
                        "tool_call_id": result.id,
                        "content": result.output.to_string()
                    }));
                }
            }
        }
    }

    messages_spec
}

/// Convert tool declarations to the OpenAI function tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

/// Convert flat model messages to Gemini `contents`.
///
/// Gemini only knows `user` and `model` turns; system messages found inside the conversation are
/// returned separately so they can be folded into the system instruction.
pub fn messages_to_gemini_spec(messages: &[ModelMessage]) -> (Vec<Value>, Vec<String>) {
    let mut contents = Vec::new();
    let mut system_texts = Vec::new();

    for message in messages {
        let role = match message.role {
            ModelRole::System => {
                system_texts.extend(message.text());
                continue;
            }
            ModelRole::User | ModelRole::Tool => "user",
            ModelRole::Assistant => "model",
        };

        let parts: Vec<Value> = message
            .content
            .iter()
            .map(|content| match content {
                ModelContent::Text(text) => json!({ "text": text }),
                ModelContent::ToolCall(call) => json!({
                    "functionCall": {
                        "name": call.name,
                        "args": as_object(&call.input),
                    }
                }),
                ModelContent::ToolResult(result) => json!({
                    "functionResponse": {
                        "name": result.name,
                        "response": as_object(&result.output),
                    }
                }),
            })
            .collect();

        if !parts.is_empty() {
            contents.push(json!({ "role": role, "parts": parts }));
        }
    }

    (contents, system_texts)
}

/// Convert tool declarations to Gemini function declarations
pub fn tools_to_gemini_spec(tools: &[Tool]) -> Vec<Value> {
    if tools.is_empty() {
        return Vec::new();
    }
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            })
        })
        .collect();
    vec![json!({ "functionDeclarations": declarations })]
}

// Gemini function responses must be JSON objects
fn as_object(value: &Value) -> Value {
    match value {
        Value::Object(_) => value.clone(),
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("result".to_string(), other.clone());
            Value::Object(wrapped)
        }
    }
}

pub fn openai_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}

pub fn gemini_finish_reason(reason: &str, saw_function_call: bool) -> FinishReason {
    match reason {
        "STOP" if saw_function_call => FinishReason::ToolCalls,
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Other,
    }
}

/// Pull `error.message` out of a backend error body, falling back to the raw body
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Error for an in-stream `{"error": {...}}` payload, if that is what this chunk is
pub fn stream_error(chunk: &Value) -> Option<ProviderError> {
    let error = chunk.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| error.to_string());
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(500);
    Some(ProviderError::Api { status, message })
}

/// Fail with the backend's own message unless the response status is a success
pub async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}
