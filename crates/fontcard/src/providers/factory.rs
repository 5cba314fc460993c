use super::{
    base::Provider, configs::ProviderConfig, gemini::GeminiProvider, groq::GroqProvider,
};
use anyhow::Result;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter};

pub const DEFAULT_PROVIDER: ProviderType = ProviderType::Gemini;

#[derive(EnumIter, AsRefStr, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    /// Fast, large-quota tool-calling model
    Groq,
    /// Low-quota, highly reliable model
    Gemini,
}

impl ProviderType {
    /// Resolve a configured provider name; anything unrecognized falls back to the default
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "groq" => ProviderType::Groq,
            "gemini" => ProviderType::Gemini,
            other => {
                tracing::warn!(
                    provider = other,
                    "unknown provider, falling back to {}",
                    DEFAULT_PROVIDER
                );
                DEFAULT_PROVIDER
            }
        }
    }

    /// The company serving this backend, used for display
    pub fn vendor(&self) -> &'static str {
        match self {
            ProviderType::Groq => "Groq",
            ProviderType::Gemini => "Google",
        }
    }
}

/// Build the backend handle; no network I/O happens here
pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config {
        ProviderConfig::Groq(groq_config) => Ok(Arc::new(GroqProvider::new(groq_config)?)),
        ProviderConfig::Gemini(gemini_config) => Ok(Arc::new(GeminiProvider::new(gemini_config)?)),
    }
}
