use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{ModelStream, Provider};
use super::configs::GeminiProviderConfig;
use super::factory::ProviderType;
use super::sse::{model_stream, ChunkParser};
use super::utils::{
    check_status, gemini_finish_reason, messages_to_gemini_spec, stream_error,
    tools_to_gemini_spec,
};
use crate::errors::ProviderError;
use crate::models::event::{FinishReason, ModelEvent};
use crate::models::model_message::ModelMessage;
use crate::tool::Tool;

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

pub struct GeminiProvider {
    client: Client,
    config: GeminiProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[ModelMessage],
        tools: &[Tool],
    ) -> Result<ModelStream, ProviderError> {
        let (contents, extra_system) = messages_to_gemini_spec(messages);
        let instruction = std::iter::once(system.to_string())
            .chain(extra_system)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut payload = json!({ "contents": contents });
        if !instruction.is_empty() {
            payload["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        let tools = tools_to_gemini_spec(tools);
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.host.trim_end_matches('/'),
            self.config.model
        );
        debug!(%url, messages = messages.len(), "starting gemini step");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(model_stream(response, GeminiChunkParser::default()))
    }
}

/// `GenerateContentResponse` chunks.
///
/// Gemini sends each function call whole, without an id, so ids are minted here and the call is
/// reported as a start, a single argument fragment and its completion.
#[derive(Default)]
struct GeminiChunkParser {
    saw_function_call: bool,
}

impl ChunkParser for GeminiChunkParser {
    fn parse(&mut self, data: &str) -> Result<Vec<ModelEvent>, ProviderError> {
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| ProviderError::Decode(format!("invalid chunk {data}: {e}")))?;
        if let Some(err) = stream_error(&chunk) {
            return Err(err);
        }

        let mut events = Vec::new();

        if chunk.pointer("/promptFeedback/blockReason").is_some() {
            events.push(ModelEvent::Finish(FinishReason::ContentFilter));
            return Ok(events);
        }

        let Some(candidate) = chunk["candidates"].get(0) else {
            return Ok(events);
        };

        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for part in parts {
            if part["thought"].as_bool().unwrap_or(false) {
                continue;
            }

            if let Some(text) = part["text"].as_str() {
                if !text.is_empty() {
                    events.push(ModelEvent::TextDelta(text.to_string()));
                }
            }

            if let Some(call) = part.get("functionCall") {
                let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                let name = call["name"].as_str().unwrap_or_default().to_string();
                let args = match call.get("args") {
                    Some(args) if !args.is_null() => args.to_string(),
                    _ => "{}".to_string(),
                };

                self.saw_function_call = true;
                events.push(ModelEvent::ToolCallStart {
                    id: id.clone(),
                    name,
                });
                events.push(ModelEvent::ToolCallArgsDelta {
                    id: id.clone(),
                    delta: args,
                });
                events.push(ModelEvent::ToolCallArgsComplete { id });
            }
        }

        if let Some(reason) = candidate["finishReason"].as_str() {
            events.push(ModelEvent::Finish(gemini_finish_reason(
                reason,
                self.saw_function_call,
            )));
        }

        Ok(events)
    }

    fn finish(&mut self) -> Vec<ModelEvent> {
        Vec::new()
    }
}
