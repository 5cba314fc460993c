//! Conversion between the caller's conversation and the flat form model backends consume.
//!
//! A caller message keeps a whole turn together, so an assistant message can hold text, the tool
//! calls it made and their results. Backends expect tool results in their own message right after
//! the assistant message that requested them, so a turn is split into alternating assistant and
//! tool blocks. [`from_model_messages`] folds those blocks back into turns.

use crate::models::message::{Message, Part, Role};
use crate::models::model_message::{ModelContent, ModelMessage, ModelRole};

fn model_role(role: Role) -> ModelRole {
    match role {
        Role::User => ModelRole::User,
        Role::Assistant => ModelRole::Assistant,
        Role::System => ModelRole::System,
    }
}

/// Translate caller messages into backend messages without dropping any part
pub fn to_model_messages(messages: &[Message]) -> Vec<ModelMessage> {
    let mut output = Vec::new();

    for message in messages {
        let mut block: Option<ModelMessage> = None;

        for part in &message.parts {
            let (role, content) = match part {
                Part::Text(text) => (model_role(message.role), ModelContent::Text(text.clone())),
                Part::ToolCall(call) => {
                    (model_role(message.role), ModelContent::ToolCall(call.clone()))
                }
                Part::ToolResult(result) => {
                    (ModelRole::Tool, ModelContent::ToolResult(result.clone()))
                }
            };

            match block.as_mut() {
                Some(current) if current.role == role => current.content.push(content),
                _ => {
                    output.extend(block.take());
                    block = Some(ModelMessage::new(role).with_content(content));
                }
            }
        }

        output.extend(block);
    }

    output
}

/// Reconstruct caller messages from backend messages.
///
/// Tool blocks, and the assistant block continuing after them, belong to the preceding turn.
pub fn from_model_messages(messages: &[ModelMessage]) -> Vec<Message> {
    let mut output: Vec<Message> = Vec::new();
    let mut previous: Option<ModelRole> = None;

    for message in messages {
        let continues_turn = match message.role {
            ModelRole::Tool => true,
            ModelRole::Assistant => previous == Some(ModelRole::Tool),
            _ => false,
        };

        let parts = message.content.iter().cloned().map(|content| match content {
            ModelContent::Text(text) => Part::Text(text),
            ModelContent::ToolCall(call) => Part::ToolCall(call),
            ModelContent::ToolResult(result) => Part::ToolResult(result),
        });

        let merge = continues_turn
            && output
                .last()
                .is_some_and(|turn| turn.role == Role::Assistant);

        match output.last_mut() {
            Some(turn) if merge => turn.parts.extend(parts),
            _ => {
                let role = match message.role {
                    ModelRole::System => Role::System,
                    ModelRole::User => Role::User,
                    ModelRole::Assistant | ModelRole::Tool => Role::Assistant,
                };
                output.push(Message {
                    role,
                    parts: parts.collect(),
                });
            }
        }

        previous = Some(message.role);
    }

    output
}
