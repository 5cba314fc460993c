use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::fonts::{FontEntry, DYNA_FONTS};
use crate::tool::FONT_CARD_TOOL;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[derive(Serialize)]
struct SystemPromptContext<'a> {
    tool_name: &'a str,
    fonts: &'a [FontEntry],
}

/// Render the advisor's system instruction, including the font knowledge base
pub fn system_prompt() -> Result<String, TeraError> {
    load_prompt(
        SYSTEM_TEMPLATE,
        &SystemPromptContext {
            tool_name: FONT_CARD_TOOL,
            fonts: DYNA_FONTS,
        },
    )
}
