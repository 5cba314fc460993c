use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::{Stream, StreamExt};

use super::base::ModelStream;
use crate::errors::ProviderError;
use crate::models::event::ModelEvent;

/// Turns backend-specific stream chunks into model events
pub trait ChunkParser: Send + 'static {
    fn parse(&mut self, data: &str) -> Result<Vec<ModelEvent>, ProviderError>;

    /// Events owed once the body has ended
    fn finish(&mut self) -> Vec<ModelEvent>;
}

/// Stream the model events of an accepted SSE response
pub fn model_stream<P: ChunkParser>(response: reqwest::Response, parser: P) -> ModelStream {
    parse_events(response.bytes_stream(), parser)
}

fn parse_events<S, B, P>(body: S, mut parser: P) -> ModelStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    P: ChunkParser,
{
    Box::pin(async_stream::stream! {
        let mut events = Box::pin(body.eventsource());

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(stream_error(e));
                    return;
                }
            };
            match parser.parse(&event.data) {
                Ok(parsed) => {
                    for parsed_event in parsed {
                        yield Ok(parsed_event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for event in parser.finish() {
            yield Ok(event);
        }
    })
}

fn stream_error(error: EventStreamError<reqwest::Error>) -> ProviderError {
    match error {
        EventStreamError::Transport(e) => ProviderError::Request(e),
        other => ProviderError::Decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    /// Echoes each payload back as text
    #[derive(Default)]
    struct EchoParser;

    impl ChunkParser for EchoParser {
        fn parse(&mut self, data: &str) -> Result<Vec<ModelEvent>, ProviderError> {
            if data == "bad" {
                return Err(ProviderError::Decode("bad chunk".to_string()));
            }
            Ok(vec![ModelEvent::TextDelta(data.to_string())])
        }

        fn finish(&mut self) -> Vec<ModelEvent> {
            vec![ModelEvent::TextDelta("end".to_string())]
        }
    }

    async fn collect(chunks: Vec<&'static str>) -> Vec<Result<ModelEvent, ProviderError>> {
        let body = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, reqwest::Error>(chunk.as_bytes())),
        );
        parse_events(body, EchoParser).collect().await
    }

    fn texts(events: Vec<Result<ModelEvent, ProviderError>>) -> Vec<String> {
        events
            .into_iter()
            .map(|event| match event {
                Ok(ModelEvent::TextDelta(text)) => text,
                other => panic!("unexpected event: {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_joins_multiline_data() {
        let events = collect(vec!["data: {\"a\":\ndata: 1}\n\n"]).await;
        assert_eq!(texts(events), vec!["{\"a\":\n1}", "end"]);
    }

    #[tokio::test]
    async fn test_handles_events_split_across_chunks() {
        let body = "data: 華康\n\ndata: [DONE]\n\n";
        let events = collect(vec![&body[..4], &body[4..14], &body[14..]]).await;
        assert_eq!(texts(events), vec!["華康", "[DONE]", "end"]);
    }

    #[tokio::test]
    async fn test_ignores_comments_and_event_names() {
        let events = collect(vec!["event: message\r\n: keep-alive\r\ndata:x\r\n\r\n"]).await;
        assert_eq!(texts(events), vec!["x", "end"]);
    }

    #[tokio::test]
    async fn test_parse_failure_ends_stream() {
        let events = collect(vec!["data: bad\n\ndata: never\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(ProviderError::Decode(_))));
    }
}
