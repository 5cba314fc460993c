use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const FONT_CARD_TOOL: &str = "show_font_card";

/// Substituted when the model leaves the font name empty
pub const MISSING_NAME_PLACEHOLDER: &str = "未指定字體";
/// Substituted when the model leaves the recommendation reason empty
pub const MISSING_DESCRIPTION_PLACEHOLDER: &str = "AI 未提供推薦理由";

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the input the tool accepts
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// The validated result of a font card call, shown to the user as a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub name: String,
    pub description: String,
}

impl ToolOutcome {
    /// The JSON output reported to the caller and fed back to the model
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
        })
    }
}

/// The `show_font_card` tool.
///
/// Selecting the font is entirely up to the model; this only checks the two fields it filled in
/// and patches whatever is missing so the card can still be rendered.
#[derive(Debug, Clone)]
pub struct FontCardTool {
    declaration: Tool,
}

impl Default for FontCardTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCardTool {
    pub fn new() -> Self {
        let declaration = Tool::new(
            FONT_CARD_TOOL,
            "推薦一款華康字體給使用者。必須提供字體名稱（name）和詳細的推薦理由（description）。",
            json!({
                "type": "object",
                "required": ["name", "description"],
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "華康字體的完整名稱，例如：華康威風體、華康金剛黑、華康儷宋體"
                    },
                    "description": {
                        "type": "string",
                        "description": "推薦理由，說明為什麼這款字體適合使用者的設計情境"
                    }
                }
            }),
        );

        Self { declaration }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn declaration(&self) -> &Tool {
        &self.declaration
    }

    /// Validate the model-provided input. Never fails: an empty or missing field is replaced
    /// with its placeholder and the other field is passed through untouched.
    pub async fn execute(&self, input: &Value) -> ToolOutcome {
        let name = non_empty_field(input, "name");
        let description = non_empty_field(input, "description");

        match (name, description) {
            (Some(name), Some(description)) => {
                info!(font = name, "recommending font");
                ToolOutcome {
                    name: name.to_string(),
                    description: description.to_string(),
                }
            }
            (name, description) => {
                warn!(
                    name = ?input.get("name"),
                    description = ?input.get("description"),
                    "incomplete {} input, substituting placeholders",
                    FONT_CARD_TOOL
                );
                ToolOutcome {
                    name: name.unwrap_or(MISSING_NAME_PLACEHOLDER).to_string(),
                    description: description
                        .unwrap_or(MISSING_DESCRIPTION_PLACEHOLDER)
                        .to_string(),
                }
            }
        }
    }
}

fn non_empty_field<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
