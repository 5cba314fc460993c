//! The UI message stream: one `data:` frame per reply event, written as the events happen.

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use fontcard::errors::{AgentResult, GENERIC_FAILURE_MESSAGE};
use fontcard::models::event::StreamEvent;
use futures::{
    stream::{BoxStream, StreamExt},
    Stream,
};
use http::header::{HeaderName, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

/// Frames queued between the agent and the response body; the agent waits while it is full
pub const FRAME_BUFFER: usize = 1;

// Custom SSE response type that implements the AI SDK UI message stream protocol
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    pub fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = Body::from_stream(self);
        (
            [
                (CONTENT_TYPE, "text/event-stream"),
                (CACHE_CONTROL, "no-cache"),
                (CONNECTION, "keep-alive"),
                (HeaderName::from_static(UI_MESSAGE_STREAM_HEADER), "v1"),
            ],
            body,
        )
            .into_response()
    }
}

// Protocol-specific frame formatting
pub struct ProtocolFormatter;

impl ProtocolFormatter {
    fn frame(chunk: Value) -> String {
        format!("data: {}\n\n", chunk)
    }

    pub fn format_start(message_id: &str) -> String {
        Self::frame(json!({ "type": "start", "messageId": message_id }))
    }

    pub fn format_start_step() -> String {
        Self::frame(json!({ "type": "start-step" }))
    }

    pub fn format_text_start(id: &str) -> String {
        Self::frame(json!({ "type": "text-start", "id": id }))
    }

    pub fn format_text_delta(id: &str, delta: &str) -> String {
        Self::frame(json!({ "type": "text-delta", "id": id, "delta": delta }))
    }

    pub fn format_text_end(id: &str) -> String {
        Self::frame(json!({ "type": "text-end", "id": id }))
    }

    pub fn format_tool_input_start(id: &str, name: &str) -> String {
        Self::frame(json!({
            "type": "tool-input-start",
            "toolCallId": id,
            "toolName": name
        }))
    }

    pub fn format_tool_input_delta(id: &str, delta: &str) -> String {
        Self::frame(json!({
            "type": "tool-input-delta",
            "toolCallId": id,
            "inputTextDelta": delta
        }))
    }

    pub fn format_tool_input_available(id: &str, name: &str, input: &Value) -> String {
        Self::frame(json!({
            "type": "tool-input-available",
            "toolCallId": id,
            "toolName": name,
            "input": input
        }))
    }

    pub fn format_tool_output_available(id: &str, output: &Value) -> String {
        Self::frame(json!({
            "type": "tool-output-available",
            "toolCallId": id,
            "output": output
        }))
    }

    pub fn format_tool_output_error(id: &str, message: &str) -> String {
        Self::frame(json!({
            "type": "tool-output-error",
            "toolCallId": id,
            "errorText": message
        }))
    }

    pub fn format_finish_step() -> String {
        Self::frame(json!({ "type": "finish-step" }))
    }

    pub fn format_finish(reason: &str) -> String {
        Self::frame(json!({ "type": "finish", "finishReason": reason }))
    }

    pub fn format_error(message: &str) -> String {
        Self::frame(json!({ "type": "error", "errorText": message }))
    }

    pub fn format_done() -> String {
        "data: [DONE]\n\n".to_string()
    }

    pub fn format_event(event: &StreamEvent) -> String {
        match event {
            StreamEvent::Start { message_id } => Self::format_start(message_id),
            StreamEvent::StepStart => Self::format_start_step(),
            StreamEvent::TextStart { id } => Self::format_text_start(id),
            StreamEvent::TextDelta { id, delta } => Self::format_text_delta(id, delta),
            StreamEvent::TextEnd { id } => Self::format_text_end(id),
            StreamEvent::ToolCallStart { id, name } => Self::format_tool_input_start(id, name),
            StreamEvent::ToolCallArgsDelta { id, delta } => Self::format_tool_input_delta(id, delta),
            StreamEvent::ToolCallReady { id, name, input } => {
                Self::format_tool_input_available(id, name, input)
            }
            StreamEvent::ToolResult { id, output } => Self::format_tool_output_available(id, output),
            StreamEvent::ToolError { id, message } => Self::format_tool_output_error(id, message),
            StreamEvent::StepFinish => Self::format_finish_step(),
            StreamEvent::Finish { reason } => Self::format_finish(reason.as_str()),
        }
    }
}

/// Write the frames of a reply into the response channel.
///
/// Stops after the terminal frame and the `[DONE]` trailer, or as soon as the caller goes away;
/// returning drops `events`, which cancels whatever the agent was waiting on.
pub async fn forward(
    mut events: BoxStream<'static, AgentResult<StreamEvent>>,
    tx: mpsc::Sender<String>,
) {
    loop {
        let item = tokio::select! {
            item = events.next() => item,
            _ = tx.closed() => {
                info!("client disconnected, cancelling reply");
                return;
            }
        };

        let (frame, terminal) = match item {
            Some(Ok(event)) => (ProtocolFormatter::format_event(&event), event.is_terminal()),
            Some(Err(err)) => (ProtocolFormatter::format_error(&err.user_message()), true),
            None => {
                warn!("reply ended without a terminal event");
                (ProtocolFormatter::format_error(GENERIC_FAILURE_MESSAGE), true)
            }
        };

        if tx.send(frame).await.is_err() {
            debug!("response channel closed");
            return;
        }
        if terminal {
            let _ = tx.send(ProtocolFormatter::format_done()).await;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontcard::errors::{AgentError, ProviderError};
    use fontcard::models::event::FinishReason;
    use futures::stream;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    async fn run(items: Vec<AgentResult<StreamEvent>>) -> Vec<String> {
        let (tx, rx) = mpsc::channel(16);
        forward(stream::iter(items).boxed(), tx).await;
        ReceiverStream::new(rx).collect().await
    }

    fn chunk(frame: &str) -> Value {
        let data = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("not an SSE data frame");
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn test_frames_are_sse_data_lines() {
        assert_eq!(
            chunk(&ProtocolFormatter::format_text_delta("txt_1", "華康")),
            json!({"type": "text-delta", "id": "txt_1", "delta": "華康"})
        );
        assert_eq!(
            chunk(&ProtocolFormatter::format_event(&StreamEvent::Finish {
                reason: FinishReason::ToolCalls
            })),
            json!({"type": "finish", "finishReason": "tool-calls"})
        );
    }

    #[test]
    fn test_tool_frames_carry_call_id() {
        let chunk = chunk(&ProtocolFormatter::format_event(&StreamEvent::ToolResult {
            id: "call_1".into(),
            output: json!({"name": "Font A", "description": "bold strokes"}),
        }));
        assert_eq!(chunk["type"], "tool-output-available");
        assert_eq!(chunk["toolCallId"], "call_1");
        assert_eq!(chunk["output"]["name"], "Font A");
    }

    #[tokio::test]
    async fn test_forward_ends_with_done_after_finish() {
        let frames = run(vec![
            Ok(StreamEvent::StepStart),
            Ok(StreamEvent::Finish {
                reason: FinishReason::Stop,
            }),
            Ok(StreamEvent::StepStart),
        ])
        .await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_forward_turns_failure_into_error_frame() {
        let frames = run(vec![
            Ok(StreamEvent::StepStart),
            Err(AgentError::from(ProviderError::Api {
                status: 503,
                message: "overloaded".into(),
            })),
        ])
        .await;

        assert_eq!(
            frames,
            vec![
                ProtocolFormatter::format_start_step(),
                ProtocolFormatter::format_error("overloaded"),
                ProtocolFormatter::format_done(),
            ]
        );
    }

    #[tokio::test]
    async fn test_forward_closes_a_truncated_reply() {
        let frames = run(vec![Ok(StreamEvent::StepStart)]).await;
        assert_eq!(frames[1], ProtocolFormatter::format_error(GENERIC_FAILURE_MESSAGE));
        assert_eq!(frames.len(), 3);
    }

    #[tokio::test]
    async fn test_forward_stops_when_client_leaves() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let finished = tokio::time::timeout(
            Duration::from_secs(1),
            forward(stream::pending::<AgentResult<StreamEvent>>().boxed(), tx),
        )
        .await;
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn test_forward_waits_for_a_stalled_client() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let events = stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(StreamEvent::StepStart)
        })
        .boxed();

        let (tx, _rx) = mpsc::channel(FRAME_BUFFER);
        let finished = tokio::time::timeout(Duration::from_millis(100), forward(events, tx)).await;

        assert!(finished.is_err());
        assert!(pulled.load(Ordering::SeqCst) <= 2);
    }
}
