use async_trait::async_trait;
use futures::stream::BoxStream;

use super::factory::ProviderType;
use crate::errors::ProviderError;
use crate::models::event::ModelEvent;
use crate::models::model_message::ModelMessage;
use crate::tool::Tool;

/// The events of one generation step, as they arrive from the backend
pub type ModelStream = BoxStream<'static, Result<ModelEvent, ProviderError>>;

/// Base trait for model backends (Groq, Gemini)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> ProviderType;

    /// The model id requests are sent to
    fn model(&self) -> &str;

    /// Start one generation step.
    ///
    /// Resolves once the backend has accepted the request; a rejected request (bad key, quota,
    /// unreachable host) fails here rather than inside the stream. Dropping the returned stream
    /// cancels the request.
    async fn stream(
        &self,
        system: &str,
        messages: &[ModelMessage],
        tools: &[Tool],
    ) -> Result<ModelStream, ProviderError>;
}
