use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use fontcard::providers::{
    configs::{GeminiProviderConfig, GroqProviderConfig, ProviderConfig},
    factory::{ProviderType, DEFAULT_PROVIDER},
    gemini, groq,
};
use serde::Deserialize;
use std::env;

/// Conventional variables read when no key is configured under the FONTCARD prefix
const GROQ_API_KEY: &str = "GROQ_API_KEY";
const GEMINI_API_KEY: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    pub host: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider")]
    pub name: String,
    pub groq: BackendSettings,
    pub gemini: BackendSettings,
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        ProviderType::from_name(&self.name)
    }

    /// Resolve the selected backend; only that backend needs an api key
    pub fn into_config(self) -> Result<ProviderConfig, ConfigError> {
        match self.provider_type() {
            ProviderType::Groq => Ok(ProviderConfig::Groq(GroqProviderConfig {
                api_key: api_key(self.groq.api_key, GROQ_API_KEY)?,
                host: self.groq.host,
                model: self.groq.model,
            })),
            ProviderType::Gemini => Ok(ProviderConfig::Gemini(GeminiProviderConfig {
                api_key: api_key(self.gemini.api_key, GEMINI_API_KEY)?,
                host: self.gemini.host,
                model: self.gemini.model,
            })),
        }
    }
}

fn api_key(configured: Option<String>, fallback_var: &str) -> Result<String, ConfigError> {
    let present = |key: &String| !key.trim().is_empty();
    configured
        .filter(present)
        .or_else(|| env::var(fallback_var).ok().filter(present))
        .ok_or_else(|| ConfigError::MissingEnvVar {
            env_var: fallback_var.to_string(),
        })
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.name", default_provider())?
            .set_default("provider.groq.host", groq::GROQ_HOST)?
            .set_default("provider.groq.model", groq::GROQ_MODEL)?
            .set_default("provider.gemini.host", gemini::GEMINI_HOST)?
            .set_default("provider.gemini.model", gemini::GEMINI_MODEL)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("FONTCARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // "missing field `name`" and NotFound both point at a variable to set
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}
