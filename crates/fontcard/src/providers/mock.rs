use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::base::{ModelStream, Provider};
use super::factory::ProviderType;
use super::gemini::GEMINI_MODEL;
use super::groq::GROQ_MODEL;
use crate::errors::ProviderError;
use crate::models::event::{FinishReason, ModelEvent};
use crate::models::model_message::ModelMessage;
use crate::tool::Tool;

/// What the mock does for one generation step
pub enum MockStep {
    /// Accept the request and stream these items
    Events(Vec<Result<ModelEvent, ProviderError>>),
    /// Reject the request before streaming
    Fail(ProviderError),
}

/// A mock provider that plays back pre-configured steps for testing
pub struct MockProvider {
    kind: ProviderType,
    steps: Mutex<VecDeque<MockStep>>,
    repeat: Option<Vec<ModelEvent>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<ModelMessage>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of steps
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self::with_kind(ProviderType::Gemini, steps)
    }

    /// A mock standing in for a particular backend
    pub fn with_kind(kind: ProviderType, steps: Vec<MockStep>) -> Self {
        Self {
            kind,
            steps: Mutex::new(steps.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every step with the same events
    pub fn repeating(events: Vec<ModelEvent>) -> Self {
        Self {
            repeat: Some(events),
            ..Self::new(Vec::new())
        }
    }

    /// Number of steps started so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The messages sent with each step
    pub fn requests(&self) -> Vec<Vec<ModelMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderType {
        self.kind
    }

    fn model(&self) -> &str {
        match self.kind {
            ProviderType::Groq => GROQ_MODEL,
            ProviderType::Gemini => GEMINI_MODEL,
        }
    }

    async fn stream(
        &self,
        _system: &str,
        messages: &[ModelMessage],
        _tools: &[Tool],
    ) -> Result<ModelStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(messages.to_vec());

        let step = self.steps.lock().unwrap().pop_front();
        let items = match step {
            Some(MockStep::Events(items)) => items,
            Some(MockStep::Fail(err)) => return Err(err),
            None => match &self.repeat {
                Some(events) => events.iter().cloned().map(Ok).collect(),
                // Return an empty reply if no more steps are configured
                None => vec![Ok(ModelEvent::Finish(FinishReason::Stop))],
            },
        };

        Ok(Box::pin(stream::iter(items)))
    }
}
