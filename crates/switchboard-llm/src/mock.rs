//! Mock provider for deterministic testing.
//!
//! Replays pre-configured responses without making any network calls.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard_core::{ChatMessage, Result, SwitchboardError};

use crate::provider::*;

/// A mock provider that streams pre-configured responses.
///
/// # Example
/// ```
/// use switchboard_llm::mock::{MockProvider, MockResponse};
/// let provider = MockProvider::new("test")
///     .with_response(MockResponse::text(["Hello", ", world"]));
/// ```
pub struct MockProvider {
    name: String,
    models: ModelSet,
    queue: Mutex<VecDeque<MockResponse>>,
    fallback: Mutex<Option<MockResponse>>,
    calls: AtomicUsize,
    /// Every `(model, messages)` pair received, for assertions in tests.
    requests: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
}

/// One scripted completion: fragments in order, then an optional error.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    pub fragments: Vec<String>,
    /// If set, raised after all fragments were delivered.
    pub error: Option<String>,
}

impl MockResponse {
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    /// Fail before producing anything.
    pub fn error(msg: &str) -> Self {
        Self {
            fragments: vec![],
            error: Some(msg.to_string()),
        }
    }

    /// Produce some fragments, then fail.
    pub fn partial<I, S>(fragments: I, msg: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            error: Some(msg.to_string()),
            ..Self::text(fragments)
        }
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: ModelSet::any(),
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: AtomicUsize::new(0),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Restrict the models this provider claims to serve.
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().collect();
        self
    }

    /// Queue a response for the next call.
    pub fn with_response(self, resp: MockResponse) -> Self {
        self.queue.lock().push_back(resp);
        self
    }

    /// Response used once the queue is drained.
    pub fn always(self, resp: MockResponse) -> Self {
        *self.fallback.lock() = Some(resp);
        self
    }

    /// Shorthand for a provider that fails every call.
    pub fn always_failing(name: impl Into<String>, msg: &str) -> Self {
        Self::new(name).always(MockResponse::error(msg))
    }

    /// Number of `stream` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>> {
        Arc::clone(&self.requests)
    }

    /// Pop the next queued response, falling back to the sticky one or a
    /// canned reply.
    fn next_response(&self) -> MockResponse {
        if let Some(resp) = self.queue.lock().pop_front() {
            return resp;
        }
        self.fallback
            .lock()
            .clone()
            .unwrap_or_else(|| MockResponse::text(["(mock: no more queued responses)"]))
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn models(&self) -> &ModelSet {
        &self.models
    }

    fn stream(&self, model: &str, messages: &[ChatMessage]) -> FragmentStream {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requests
            .lock()
            .push((model.to_string(), messages.to_vec()));

        let mock = self.next_response();
        let mut items: Vec<Result<String>> = mock
            .fragments
            .into_iter()
            .filter(|f| !f.is_empty())
            .map(Ok)
            .collect();
        if let Some(error) = mock.error {
            items.push(Err(SwitchboardError::provider(&self.name, error)));
        }
        futures::stream::iter(items).boxed()
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn hi() -> Vec<ChatMessage> {
        vec![ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn test_mock_streams_fragments() {
        let provider = MockProvider::new("mock").with_response(MockResponse::text(["Hello", " world"]));
        let out: Vec<String> = provider.stream("m", &hi()).try_collect().await.unwrap();
        assert_eq!(out, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_mock_error() {
        let provider = MockProvider::new("mock").with_response(MockResponse::error("HTTP 429: rate limited"));
        let result: Result<Vec<String>> = provider.stream("m", &hi()).try_collect().await;
        assert!(matches!(result, Err(SwitchboardError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_mock_partial_then_error() {
        let provider = MockProvider::new("mock").with_response(MockResponse::partial(["a", "b"], "cut off"));
        let mut stream = provider.stream("m", &hi());
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "b");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_multiple_responses_in_order_then_fallback() {
        let provider = MockProvider::new("mock")
            .with_response(MockResponse::text(["first"]))
            .with_response(MockResponse::text(["second"]))
            .always(MockResponse::text(["again"]));

        for expected in ["first", "second", "again", "again"] {
            let out: Vec<String> = provider.stream("m", &hi()).try_collect().await.unwrap();
            assert_eq!(out, vec![expected]);
        }
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let provider = MockProvider::new("mock");
        let _ = provider.stream("gpt-4o", &[ChatMessage::system("be nice"), ChatMessage::user("hello")]);
        let recorded = provider.recorded_requests();
        let recorded = recorded.lock();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "gpt-4o");
        assert_eq!(recorded[0].1[0].content, "be nice");
    }

    #[test]
    fn test_with_models() {
        let provider = MockProvider::new("mock").with_models(&["a", "b"]);
        assert!(provider.models().supports("a"));
        assert!(!provider.models().supports("c"));
    }
}
