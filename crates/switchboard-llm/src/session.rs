use futures::StreamExt;
use futures::stream::BoxStream;
use switchboard_core::{ChatMessage, Result, SwitchboardError};
use tracing::debug;

use crate::framing::ChunkEncoder;
use crate::provider::FragmentStream;
use crate::router::ProviderRouter;

/// One validated chat request bound to a router.
pub struct ChatSession {
    router: ProviderRouter,
    model: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(router: ProviderRouter, model: impl Into<String>, messages: Vec<ChatMessage>) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(SwitchboardError::InvalidRequest("model must not be empty".into()));
        }
        if messages.is_empty() {
            return Err(SwitchboardError::InvalidRequest("messages must not be empty".into()));
        }
        Ok(Self {
            router,
            model,
            messages,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn stream(self) -> FragmentStream {
        self.router.stream_chat(&self.model, self.messages)
    }

    /// Drain the stream into one string.
    pub fn collect(self) -> impl Future<Output = Result<String>> + Send + 'static {
        let mut stream = self.stream();
        async move {
            let mut text = String::new();
            while let Some(fragment) = stream.next().await {
                text.push_str(&fragment?);
            }
            Ok(text)
        }
    }

    /// Render the completion as server-sent events. A terminal error becomes
    /// an error event; the sequence always ends with `[DONE]`.
    pub fn into_sse(self) -> BoxStream<'static, String> {
        let encoder = ChunkEncoder::new(self.model.clone());
        let mut fragments = self.stream();
        Box::pin(async_stream::stream! {
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => yield encoder.fragment(&fragment),
                    Err(e) => {
                        debug!(id = encoder.id(), error = %e, "completion ended with error");
                        yield encoder.error(&e.to_string());
                        return;
                    }
                }
            }
            yield encoder.finish();
        })
    }
}
