use futures::stream::{BoxStream, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::{AgentError, AgentResult};
use crate::models::event::{FinishReason, ModelEvent, StreamEvent};
use crate::models::message::{Message, ToolCall, ToolResult};
use crate::models::model_message::{ModelContent, ModelMessage, ModelRole};
use crate::providers::base::Provider;
use crate::tool::FontCardTool;
use crate::translator::to_model_messages;

/// Maximum number of model round trips for one reply
pub const STEP_BUDGET: usize = 5;

/// Where a reply is in its generate / call tool / generate cycle
enum State {
    /// Waiting on one model step
    Generating,
    /// The step ended with complete tool calls that must be answered
    ToolRequested {
        assistant: ModelMessage,
        calls: Vec<ToolCall>,
    },
    ToolExecuting {
        calls: Vec<ToolCall>,
    },
    Finished(FinishReason),
    /// A fatal failure; every id in `unresolved` is a tool call the caller saw start
    Aborted {
        error: AgentError,
        unresolved: Vec<String>,
    },
}

struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Collects argument fragments per tool call id until the backend says they are complete
#[derive(Default)]
struct ToolCallAccumulator {
    pending: Vec<PendingCall>,
}

impl ToolCallAccumulator {
    fn start(&mut self, id: &str, name: &str) {
        if self.pending.iter().all(|call| call.id != id) {
            self.pending.push(PendingCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: String::new(),
            });
        }
    }

    fn push(&mut self, id: &str, fragment: &str) -> AgentResult<()> {
        let call = self
            .pending
            .iter_mut()
            .find(|call| call.id == id)
            .ok_or_else(|| AgentError::UnknownToolCall(id.to_string()))?;
        call.arguments.push_str(fragment);
        Ok(())
    }

    fn complete(&mut self, id: &str) -> AgentResult<ToolCall> {
        let position = self
            .pending
            .iter()
            .position(|call| call.id == id)
            .ok_or_else(|| AgentError::UnknownToolCall(id.to_string()))?;
        let call = self.pending.remove(position);

        let input = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                warn!(id = %call.id, error = %e, "tool arguments are not valid JSON");
                Value::String(call.arguments.clone())
            })
        };

        Ok(ToolCall::new(call.id, call.name, input))
    }

    fn open_ids(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|call| call.id.as_str())
    }
}

/// Everything one model step has produced so far
#[derive(Default)]
struct StepState {
    text_id: Option<String>,
    content: Vec<ModelContent>,
    calls: ToolCallAccumulator,
    ready: Vec<ToolCall>,
    finish: Option<FinishReason>,
}

impl StepState {
    fn apply(&mut self, event: ModelEvent) -> AgentResult<Vec<StreamEvent>> {
        let mut events = Vec::new();

        match event {
            ModelEvent::TextDelta(delta) => {
                let id = match &self.text_id {
                    Some(id) => id.clone(),
                    None => {
                        let id = format!("txt_{}", Uuid::new_v4().simple());
                        self.text_id = Some(id.clone());
                        self.content.push(ModelContent::Text(String::new()));
                        events.push(StreamEvent::TextStart { id: id.clone() });
                        id
                    }
                };
                if let Some(ModelContent::Text(text)) = self.content.last_mut() {
                    text.push_str(&delta);
                }
                events.push(StreamEvent::TextDelta { id, delta });
            }
            ModelEvent::ToolCallStart { id, name } => {
                events.extend(self.close_text());
                self.calls.start(&id, &name);
                events.push(StreamEvent::ToolCallStart { id, name });
            }
            ModelEvent::ToolCallArgsDelta { id, delta } => {
                self.calls.push(&id, &delta)?;
                events.push(StreamEvent::ToolCallArgsDelta { id, delta });
            }
            ModelEvent::ToolCallArgsComplete { id } => {
                let call = self.calls.complete(&id)?;
                events.push(StreamEvent::ToolCallReady {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                });
                self.content.push(ModelContent::ToolCall(call.clone()));
                self.ready.push(call);
            }
            ModelEvent::Finish(reason) => {
                events.extend(self.close_text());
                self.finish = Some(reason);
            }
        }

        Ok(events)
    }

    fn close_text(&mut self) -> Option<StreamEvent> {
        self.text_id.take().map(|id| StreamEvent::TextEnd { id })
    }

    fn incomplete(&self) -> Option<AgentError> {
        self.calls
            .open_ids()
            .next()
            .map(|id| AgentError::IncompleteToolCall(id.to_string()))
    }

    /// Started calls that have not been answered, in the order they started
    fn unresolved(&self) -> Vec<String> {
        self.ready
            .iter()
            .map(|call| call.id.clone())
            .chain(self.calls.open_ids().map(String::from))
            .collect()
    }

    fn next_state(self) -> State {
        if self.ready.is_empty() {
            return State::Finished(self.finish.unwrap_or(FinishReason::Unknown));
        }
        let mut assistant = ModelMessage::new(ModelRole::Assistant);
        assistant.content = self.content;
        State::ToolRequested {
            assistant,
            calls: self.ready,
        }
    }
}

/// Agent drives the model through alternating text generation and font card calls
pub struct Agent {
    provider: Arc<dyn Provider>,
    tool: FontCardTool,
    system_prompt: Arc<str>,
    step_budget: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider and rendered system prompt
    pub fn new(provider: Arc<dyn Provider>, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            provider,
            tool: FontCardTool::new(),
            system_prompt: system_prompt.into(),
            step_budget: STEP_BUDGET,
        }
    }

    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Stream the reply to a conversation.
    ///
    /// The stream ends after a `Finish` event or after a single `Err`; when that error comes
    /// first, nothing has been generated yet. Dropping the stream cancels the in-flight model
    /// request and any tool execution.
    pub fn reply(&self, messages: Vec<Message>) -> BoxStream<'static, AgentResult<StreamEvent>> {
        let provider = Arc::clone(&self.provider);
        let tool = self.tool.clone();
        let system_prompt = Arc::clone(&self.system_prompt);
        let step_budget = self.step_budget;
        let mut conversation = to_model_messages(&messages);

        Box::pin(async_stream::stream! {
            let tools = vec![tool.declaration().clone()];
            let message_id = format!("msg_{}", Uuid::new_v4().simple());
            let mut started = false;
            let mut step = 0;
            let mut state = State::Generating;

            loop {
                state = match state {
                    State::Generating => {
                        debug!(step = step + 1, messages = conversation.len(), "generating");
                        match provider.stream(&system_prompt, &conversation, &tools).await {
                            Err(e) => State::Aborted {
                                error: e.into(),
                                unresolved: Vec::new(),
                            },
                            Ok(mut events) => {
                                if !started {
                                    started = true;
                                    yield Ok(StreamEvent::Start { message_id: message_id.clone() });
                                }
                                yield Ok(StreamEvent::StepStart);
                                step += 1;

                                let mut current = StepState::default();
                                let mut failure = None;
                                while let Some(item) = events.next().await {
                                    match item.map_err(AgentError::from).and_then(|event| current.apply(event)) {
                                        Ok(produced) => {
                                            for event in produced {
                                                yield Ok(event);
                                            }
                                        }
                                        Err(e) => {
                                            failure = Some(e);
                                            break;
                                        }
                                    }
                                    if current.finish.is_some() {
                                        break;
                                    }
                                }

                                // Nothing follows a backend failure but the failure itself
                                if failure.is_none() {
                                    if let Some(event) = current.close_text() {
                                        yield Ok(event);
                                    }
                                }
                                match failure.or_else(|| current.incomplete()) {
                                    Some(error) => State::Aborted {
                                        unresolved: current.unresolved(),
                                        error,
                                    },
                                    None => match current.next_state() {
                                        State::Finished(reason) => {
                                            yield Ok(StreamEvent::StepFinish);
                                            State::Finished(reason)
                                        }
                                        next => next,
                                    },
                                }
                            }
                        }
                    }
                    State::ToolRequested { assistant, calls } => {
                        debug!(step, calls = calls.len(), "tool requested");
                        conversation.push(assistant);
                        State::ToolExecuting { calls }
                    }
                    State::ToolExecuting { calls } => {
                        let mut results = ModelMessage::new(ModelRole::Tool);
                        for call in calls {
                            let output = if call.name == tool.name() {
                                let outcome = tool.execute(&call.input).await;
                                let output = outcome.to_value();
                                yield Ok(StreamEvent::ToolResult {
                                    id: call.id.clone(),
                                    output: output.clone(),
                                });
                                output
                            } else {
                                warn!(tool = %call.name, "model called an unknown tool");
                                let message = format!("Unknown tool: {}", call.name);
                                yield Ok(StreamEvent::ToolError {
                                    id: call.id.clone(),
                                    message: message.clone(),
                                });
                                json!({ "error": message })
                            };
                            results = results.with_content(ModelContent::ToolResult(
                                ToolResult::new(call.id, call.name, output),
                            ));
                        }
                        conversation.push(results);
                        yield Ok(StreamEvent::StepFinish);

                        if step < step_budget {
                            State::Generating
                        } else {
                            info!(step_budget, "step budget exhausted");
                            State::Finished(FinishReason::ToolCalls)
                        }
                    }
                    State::Finished(reason) => {
                        debug!(step, reason = reason.as_str(), "reply finished");
                        yield Ok(StreamEvent::Finish { reason });
                        break;
                    }
                    State::Aborted { error, unresolved } => {
                        error!(step, error = %error, "reply aborted");
                        let message = error.user_message();
                        for id in unresolved {
                            yield Ok(StreamEvent::ToolError { id, message: message.clone() });
                        }
                        yield Err(error);
                        break;
                    }
                };
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::providers::mock::{MockProvider, MockStep};
    use crate::tool::{FONT_CARD_TOOL, MISSING_NAME_PLACEHOLDER};
    use futures::StreamExt;

    fn text_step(text: &[&str]) -> MockStep {
        let mut events: Vec<Result<ModelEvent, ProviderError>> = text
            .iter()
            .map(|delta| Ok(ModelEvent::TextDelta(delta.to_string())))
            .collect();
        events.push(Ok(ModelEvent::Finish(FinishReason::Stop)));
        MockStep::Events(events)
    }

    fn tool_events(id: &str, fragments: &[&str]) -> Vec<ModelEvent> {
        let mut events = vec![ModelEvent::ToolCallStart {
            id: id.to_string(),
            name: FONT_CARD_TOOL.to_string(),
        }];
        events.extend(fragments.iter().map(|delta| ModelEvent::ToolCallArgsDelta {
            id: id.to_string(),
            delta: delta.to_string(),
        }));
        events.push(ModelEvent::ToolCallArgsComplete { id: id.to_string() });
        events.push(ModelEvent::Finish(FinishReason::ToolCalls));
        events
    }

    fn tool_step(id: &str, fragments: &[&str]) -> MockStep {
        MockStep::Events(tool_events(id, fragments).into_iter().map(Ok).collect())
    }

    fn agent(provider: Arc<MockProvider>) -> Agent {
        Agent::new(provider, "system prompt")
    }

    fn user_request() -> Vec<Message> {
        vec![Message::user().with_text("I need a font for a martial-arts novel cover")]
    }

    async fn collect(agent: &Agent, messages: Vec<Message>) -> Vec<AgentResult<StreamEvent>> {
        agent.reply(messages).collect().await
    }

    fn events(items: Vec<AgentResult<StreamEvent>>) -> Vec<StreamEvent> {
        items
            .into_iter()
            .map(|item| item.expect("unexpected error"))
            .collect()
    }

    fn count(events: &[StreamEvent], f: impl Fn(&StreamEvent) -> bool) -> usize {
        events.iter().filter(|event| f(event)).count()
    }

    #[tokio::test]
    async fn test_text_only_reply() {
        let provider = Arc::new(MockProvider::new(vec![text_step(&["Hello", " world"])]));
        let events = events(collect(&agent(provider.clone()), user_request()).await);

        assert!(matches!(events[0], StreamEvent::Start { .. }));
        assert_eq!(events[1], StreamEvent::StepStart);
        let StreamEvent::TextStart { id } = &events[2] else {
            panic!("expected text start, got {:?}", events[2]);
        };
        assert_eq!(
            events[3..],
            [
                StreamEvent::TextDelta {
                    id: id.clone(),
                    delta: "Hello".into()
                },
                StreamEvent::TextDelta {
                    id: id.clone(),
                    delta: " world".into()
                },
                StreamEvent::TextEnd { id: id.clone() },
                StreamEvent::StepFinish,
                StreamEvent::Finish {
                    reason: FinishReason::Stop
                },
            ]
        );
        assert_eq!(count(&events, |e| matches!(e, StreamEvent::ToolCallStart { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, StreamEvent::ToolResult { .. })), 0);
        assert_eq!(count(&events, StreamEvent::is_terminal), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_then_follow_up_text() {
        let provider = Arc::new(MockProvider::new(vec![
            tool_step(
                "call_1",
                &["{\"name\":\"Font A\",", "\"description\":\"bold strokes\"}"],
            ),
            text_step(&["Font A ", "fits a wuxia cover."]),
        ]));
        let events = events(collect(&agent(provider.clone()), user_request()).await);

        assert_eq!(count(&events, |e| matches!(e, StreamEvent::ToolCallStart { .. })), 1);
        let results: Vec<&Value> = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::ToolResult { id, output } if id == "call_1" => Some(output),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            vec![&json!({"name": "Font A", "description": "bold strokes"})]
        );

        let result_at = events
            .iter()
            .position(|e| matches!(e, StreamEvent::ToolResult { .. }))
            .unwrap();
        let first_text_at = events
            .iter()
            .position(|e| matches!(e, StreamEvent::TextDelta { .. }))
            .unwrap();
        assert!(result_at < first_text_at);
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Finish {
                reason: FinishReason::Stop
            })
        );
        assert_eq!(count(&events, |e| *e == StreamEvent::StepStart), 2);
        assert_eq!(count(&events, |e| *e == StreamEvent::StepFinish), 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_tool_history_threads_into_next_step() {
        let provider = Arc::new(MockProvider::new(vec![
            tool_step("call_1", &["{\"name\":\"Font A\",\"description\":\"bold strokes\"}"]),
            text_step(&["Done"]),
        ]));
        collect(&agent(provider.clone()), user_request()).await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].len(), 1);

        let second = &requests[1];
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, ModelRole::Assistant);
        assert_eq!(second[1].tool_calls().next().unwrap().id, "call_1");
        assert_eq!(second[2].role, ModelRole::Tool);
        let result = second[2].tool_results().next().unwrap();
        assert_eq!(result.id, "call_1");
        assert_eq!(
            result.output,
            json!({"name": "Font A", "description": "bold strokes"})
        );
    }

    #[tokio::test]
    async fn test_step_budget_stops_a_tool_loop() {
        let provider = Arc::new(MockProvider::repeating(tool_events(
            "call_loop",
            &["{\"name\":\"Font A\",\"description\":\"bold strokes\"}"],
        )));
        let events = events(collect(&agent(provider.clone()), user_request()).await);

        assert_eq!(provider.calls(), STEP_BUDGET);
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Finish {
                reason: FinishReason::ToolCalls
            })
        );
        assert_eq!(count(&events, StreamEvent::is_terminal), 1);

        let started = count(&events, |e| matches!(e, StreamEvent::ToolCallStart { .. }));
        let resolved = count(&events, |e| {
            matches!(e, StreamEvent::ToolResult { .. } | StreamEvent::ToolError { .. })
        });
        assert_eq!(started, STEP_BUDGET);
        assert_eq!(resolved, STEP_BUDGET);

        // The last tool result is the final thing before the step and reply close
        let n = events.len();
        assert!(matches!(events[n - 3], StreamEvent::ToolResult { .. }));
        assert_eq!(events[n - 2], StreamEvent::StepFinish);
    }

    #[tokio::test]
    async fn test_custom_step_budget() {
        let provider = Arc::new(MockProvider::repeating(tool_events("call", &["{}"])));
        let agent = agent(provider.clone()).with_step_budget(2);
        let events = events(collect(&agent, user_request()).await);

        assert_eq!(provider.calls(), 2);
        assert_eq!(count(&events, |e| matches!(e, StreamEvent::ToolResult { .. })), 2);
    }

    #[tokio::test]
    async fn test_placeholder_substitution_completes_reply() {
        let provider = Arc::new(MockProvider::new(vec![
            tool_step("call_1", &["{\"name\":\"\",\"description\":\"x\"}"]),
            text_step(&["ok"]),
        ]));
        let events = events(collect(&agent(provider), user_request()).await);

        assert!(events.contains(&StreamEvent::ToolResult {
            id: "call_1".into(),
            output: json!({"name": MISSING_NAME_PLACEHOLDER, "description": "x"}),
        }));
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Finish {
                reason: FinishReason::Stop
            })
        );
    }

    #[tokio::test]
    async fn test_failure_mid_stream_keeps_streamed_text() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Events(vec![
            Ok(ModelEvent::TextDelta("Hel".into())),
            Ok(ModelEvent::TextDelta("lo".into())),
            Err(ProviderError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
            Ok(ModelEvent::TextDelta("never seen".into())),
        ])]));
        let items = collect(&agent(provider.clone()), user_request()).await;

        let deltas: Vec<&str> = items
            .iter()
            .filter_map(|item| match item {
                Ok(StreamEvent::TextDelta { delta, .. }) => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert!(matches!(
            &items[items.len() - 2],
            Ok(StreamEvent::TextDelta { delta, .. }) if delta == "lo"
        ));

        let last = items.last().unwrap();
        match last {
            Err(err) => assert_eq!(err.user_message(), "overloaded"),
            Ok(event) => panic!("expected a failure, got {event:?}"),
        }
        assert!(!items.iter().any(|item| matches!(item, Ok(e) if e.is_terminal())));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_step_rejection_is_the_first_item() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Fail(ProviderError::Api {
            status: 429,
            message: "Resource has been exhausted".into(),
        })]));
        let items = collect(&agent(provider), user_request()).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(AgentError::Provider(ProviderError::Api { status: 429, .. }))
        ));
    }

    #[tokio::test]
    async fn test_failure_during_tool_call_resolves_it() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Events(vec![
            Ok(ModelEvent::ToolCallStart {
                id: "call_1".into(),
                name: FONT_CARD_TOOL.into(),
            }),
            Ok(ModelEvent::ToolCallArgsDelta {
                id: "call_1".into(),
                delta: "{\"name\"".into(),
            }),
            Err(ProviderError::Decode("connection reset".into())),
        ])]));
        let items = collect(&agent(provider), user_request()).await;

        let n = items.len();
        assert!(matches!(
            &items[n - 2],
            Ok(StreamEvent::ToolError { id, .. }) if id == "call_1"
        ));
        assert!(matches!(&items[n - 1], Err(AgentError::Provider(_))));
    }

    #[tokio::test]
    async fn test_step_ending_with_open_arguments_aborts() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Events(vec![
            Ok(ModelEvent::ToolCallStart {
                id: "call_1".into(),
                name: FONT_CARD_TOOL.into(),
            }),
            Ok(ModelEvent::ToolCallArgsDelta {
                id: "call_1".into(),
                delta: "{}".into(),
            }),
        ])]));
        let items = collect(&agent(provider), user_request()).await;

        assert!(items
            .iter()
            .any(|item| matches!(item, Ok(StreamEvent::ToolError { id, .. }) if id == "call_1")));
        assert!(matches!(
            items.last(),
            Some(Err(AgentError::IncompleteToolCall(id))) if id == "call_1"
        ));
    }

    #[tokio::test]
    async fn test_arguments_for_unknown_call_abort() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Events(vec![Ok(
            ModelEvent::ToolCallArgsDelta {
                id: "ghost".into(),
                delta: "{}".into(),
            },
        )])]));
        let items = collect(&agent(provider), user_request()).await;

        assert!(matches!(
            items.last(),
            Some(Err(AgentError::UnknownToolCall(id))) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_name_is_reported_to_model() {
        let provider = Arc::new(MockProvider::new(vec![
            MockStep::Events(vec![
                Ok(ModelEvent::ToolCallStart {
                    id: "call_1".into(),
                    name: "search_web".into(),
                }),
                Ok(ModelEvent::ToolCallArgsComplete { id: "call_1".into() }),
                Ok(ModelEvent::Finish(FinishReason::ToolCalls)),
            ]),
            text_step(&["Sorry"]),
        ]));
        let events = events(collect(&agent(provider.clone()), user_request()).await);

        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::ToolError { id, .. } if id == "call_1")));
        let requests = provider.requests();
        let result = requests[1][2].tool_results().next().unwrap();
        assert_eq!(result.output, json!({"error": "Unknown tool: search_web"}));
    }

    #[tokio::test]
    async fn test_text_around_tool_call_gets_separate_ids() {
        let provider = Arc::new(MockProvider::new(vec![
            MockStep::Events(vec![
                Ok(ModelEvent::TextDelta("Let me look.".into())),
                Ok(ModelEvent::ToolCallStart {
                    id: "call_1".into(),
                    name: FONT_CARD_TOOL.into(),
                }),
                Ok(ModelEvent::ToolCallArgsComplete { id: "call_1".into() }),
                Ok(ModelEvent::Finish(FinishReason::ToolCalls)),
            ]),
            text_step(&["Here it is."]),
        ]));
        let events = events(collect(&agent(provider.clone()), user_request()).await);

        let starts: Vec<&String> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextStart { id } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 2);
        assert_ne!(starts[0], starts[1]);
        assert_eq!(
            count(&events, |e| matches!(e, StreamEvent::TextEnd { .. })),
            2
        );

        // Missing arguments reach the tool as an empty object
        assert!(events.contains(&StreamEvent::ToolCallReady {
            id: "call_1".into(),
            name: FONT_CARD_TOOL.into(),
            input: json!({}),
        }));
        let requests = provider.requests();
        assert_eq!(requests[1][1].text().as_deref(), Some("Let me look."));
    }

    #[tokio::test]
    async fn test_stream_without_finish_is_unknown() {
        let provider = Arc::new(MockProvider::new(vec![MockStep::Events(vec![Ok(
            ModelEvent::TextDelta("cut".into()),
        )])]));
        let events = events(collect(&agent(provider), user_request()).await);

        assert_eq!(
            events.last(),
            Some(&StreamEvent::Finish {
                reason: FinishReason::Unknown
            })
        );
    }

    #[tokio::test]
    async fn test_dropping_the_reply_stops_generation() {
        let provider = Arc::new(MockProvider::repeating(tool_events("call", &["{}"])));
        let agent = agent(provider.clone());

        let mut reply = agent.reply(user_request());
        while let Some(item) = reply.next().await {
            if matches!(item, Ok(StreamEvent::ToolResult { .. })) {
                break;
            }
        }
        drop(reply);

        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_accumulator_joins_fragments_in_order() {
        let mut calls = ToolCallAccumulator::default();
        calls.start("a", FONT_CARD_TOOL);
        calls.start("b", FONT_CARD_TOOL);
        calls.push("b", "{\"name\":").unwrap();
        calls.push("a", "{\"name\":\"A\"}").unwrap();
        calls.push("b", "\"B\"}").unwrap();

        let b = calls.complete("b").unwrap();
        assert_eq!(b.input, json!({"name": "B"}));
        assert_eq!(calls.open_ids().collect::<Vec<_>>(), vec!["a"]);
        assert!(matches!(
            calls.complete("b"),
            Err(AgentError::UnknownToolCall(_))
        ));
    }

    #[test]
    fn test_accumulator_keeps_invalid_json_raw() {
        let mut calls = ToolCallAccumulator::default();
        calls.start("a", FONT_CARD_TOOL);
        calls.push("a", "{\"name\": oops").unwrap();
        let call = calls.complete("a").unwrap();
        assert_eq!(call.input, Value::String("{\"name\": oops".into()));
    }
}
