//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - UI messages, sent from the chat interface to the server
//! - UI message stream frames, sent from the server back to the interface
//! - openai-compatible chat messages/tools, sent to Groq
//! - gemini contents/function declarations, sent to Google
//!
//! The caller-facing [`message::Message`] keeps tool calls and their results side by side inside
//! a turn, while [`model_message::ModelMessage`] is the flat role/content form every backend
//! consumes. Events flowing out of a backend and out of the agent live in [`event`].
pub mod event;
pub mod message;
pub mod model_message;
