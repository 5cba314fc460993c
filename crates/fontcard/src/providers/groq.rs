use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{ModelStream, Provider};
use super::configs::GroqProviderConfig;
use super::factory::ProviderType;
use super::sse::{model_stream, ChunkParser};
use super::utils::{
    check_status, messages_to_openai_spec, openai_finish_reason, stream_error,
    tools_to_openai_spec,
};
use crate::errors::ProviderError;
use crate::models::event::ModelEvent;
use crate::models::model_message::ModelMessage;
use crate::tool::Tool;

pub const GROQ_HOST: &str = "https://api.groq.com/openai";
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

pub struct GroqProvider {
    client: Client,
    config: GroqProviderConfig,
}

impl GroqProvider {
    pub fn new(config: GroqProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Groq
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
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(system, messages),
            "stream": true
        });
        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_openai_spec(tools));
        }

        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        debug!(%url, messages = messages.len(), "starting groq step");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(model_stream(response, OpenAiChunkParser::default()))
    }
}

struct OpenCall {
    index: u64,
    id: String,
}

/// Chat completion chunks, with tool call fragments keyed by their `index`
#[derive(Default)]
struct OpenAiChunkParser {
    open_calls: Vec<OpenCall>,
}

impl OpenAiChunkParser {
    fn close_calls(&mut self, events: &mut Vec<ModelEvent>) {
        self.open_calls.sort_by_key(|call| call.index);
        events.extend(
            self.open_calls
                .drain(..)
                .map(|call| ModelEvent::ToolCallArgsComplete { id: call.id }),
        );
    }
}

impl ChunkParser for OpenAiChunkParser {
    fn parse(&mut self, data: &str) -> Result<Vec<ModelEvent>, ProviderError> {
        if data.trim() == "[DONE]" || data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| ProviderError::Decode(format!("invalid chunk {data}: {e}")))?;
        if let Some(err) = stream_error(&chunk) {
            return Err(err);
        }

        let mut events = Vec::new();
        let Some(choice) = chunk["choices"].get(0) else {
            return Ok(events);
        };
        let delta = &choice["delta"];

        if let Some(content) = delta["content"].as_str() {
            if !content.is_empty() {
                events.push(ModelEvent::TextDelta(content.to_string()));
            }
        }

        if let Some(tool_calls) = delta["tool_calls"].as_array() {
            for (position, fragment) in tool_calls.iter().enumerate() {
                let index = fragment["index"].as_u64().unwrap_or(position as u64);

                let id = match self.open_calls.iter().find(|call| call.index == index) {
                    Some(call) => call.id.clone(),
                    None => {
                        let id = fragment["id"].as_str().ok_or_else(|| {
                            ProviderError::Decode(format!(
                                "tool call fragment for unknown index {index}"
                            ))
                        })?;
                        let name = fragment["function"]["name"].as_str().unwrap_or_default();
                        self.open_calls.push(OpenCall {
                            index,
                            id: id.to_string(),
                        });
                        events.push(ModelEvent::ToolCallStart {
                            id: id.to_string(),
                            name: name.to_string(),
                        });
                        id.to_string()
                    }
                };

                if let Some(arguments) = fragment["function"]["arguments"].as_str() {
                    if !arguments.is_empty() {
                        events.push(ModelEvent::ToolCallArgsDelta {
                            id,
                            delta: arguments.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(reason) = choice["finish_reason"].as_str() {
            self.close_calls(&mut events);
            events.push(ModelEvent::Finish(openai_finish_reason(reason)));
        }

        Ok(events)
    }

    fn finish(&mut self) -> Vec<ModelEvent> {
        // Without a finish_reason the open calls are left open; the agent treats them as incomplete
        Vec::new()
    }
}
