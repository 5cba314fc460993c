use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a step (or the whole reply) stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other,
    Unknown,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content-filter",
            FinishReason::ToolCalls => "tool-calls",
            FinishReason::Other => "other",
            FinishReason::Unknown => "unknown",
        }
    }
}

/// Events produced by a model backend for a single step
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    TextDelta(String),
    ToolCallStart { id: String, name: String },
    /// A fragment of the JSON-encoded arguments; fragments must be concatenated in order
    ToolCallArgsDelta { id: String, delta: String },
    ToolCallArgsComplete { id: String },
    Finish(FinishReason),
}

/// Events produced by the agent across all steps of one reply, in the order the caller sees them
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start { message_id: String },
    StepStart,
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ToolCallStart { id: String, name: String },
    ToolCallArgsDelta { id: String, delta: String },
    /// The arguments of a tool call are complete and parsed
    ToolCallReady { id: String, name: String, input: Value },
    ToolResult { id: String, output: Value },
    /// A started tool call that will never receive a result
    ToolError { id: String, message: String },
    StepFinish,
    Finish { reason: FinishReason },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Finish { .. })
    }
}
