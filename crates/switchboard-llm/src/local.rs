use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use switchboard_config::ProviderConfig;
use switchboard_core::{ChatMessage, Result, SwitchboardError};
use tracing::info;

use crate::provider::*;
use crate::sse::LineBuffer;

const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Raw output of a local engine. Faults are arbitrary errors; the provider
/// wraps them.
pub type EngineStream = BoxStream<'static, anyhow::Result<String>>;

/// An in-process completion mechanism driven by [`LocalProvider`].
#[async_trait]
pub trait LocalEngine: Send + Sync {
    /// Short description for logs and `providers` output.
    fn describe(&self) -> String;

    /// Generate a streamed completion for `(model, messages)`.
    fn generate(&self, model: &str, messages: &[ChatMessage]) -> EngineStream;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Local model provider — relays fragments from a [`LocalEngine`].
pub struct LocalProvider {
    name: String,
    models: ModelSet,
    engine: Arc<dyn LocalEngine>,
}

impl LocalProvider {
    pub fn new(name: impl Into<String>, models: ModelSet, engine: Arc<dyn LocalEngine>) -> Self {
        Self {
            name: name.into(),
            models,
            engine,
        }
    }

    /// Build from a `[[providers]]` descriptor, backed by a [`DaemonEngine`].
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let base_url = cfg.setting_str("base_url").unwrap_or(DEFAULT_ENGINE_URL);
        let timeout = cfg.setting_u64("timeout_secs").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let engine = DaemonEngine::new(base_url, Duration::from_secs(timeout))
            .map_err(|e| SwitchboardError::provider(&cfg.name, format!("{e:#}")))?;
        Ok(Self::new(
            cfg.name.clone(),
            cfg.models.iter().collect(),
            Arc::new(engine),
        ))
    }
}

#[async_trait]
impl ChatProvider for LocalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    fn models(&self) -> &ModelSet {
        &self.models
    }

    fn stream(&self, model: &str, messages: &[ChatMessage]) -> FragmentStream {
        let name = self.name.clone();
        let mut output = self.engine.generate(model, messages);
        Box::pin(async_stream::stream! {
            while let Some(item) = output.next().await {
                match item {
                    Ok(fragment) if fragment.is_empty() => continue,
                    Ok(fragment) => yield Ok(fragment),
                    Err(e) => {
                        yield Err(SwitchboardError::provider(&name, format!("{e:#}")));
                        return;
                    }
                }
            }
        })
    }

    async fn health_check(&self) -> Result<()> {
        info!(provider = %self.name, engine = %self.engine.describe(), "checking local engine health");
        self.engine
            .ping()
            .await
            .map_err(|e| SwitchboardError::provider(&self.name, format!("{e:#}")))
    }
}

// ── Daemon engine ──────────────────────────────────────────────

/// Talks to a local inference daemon (llama.cpp server, Ollama, ...) over its
/// newline-delimited JSON chat API.
pub struct DaemonEngine {
    client: reqwest::Client,
    /// Address of the local inference server (e.g. "http://127.0.0.1:11434")
    base_url: String,
}

impl DaemonEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// One NDJSON object from the daemon. The last one carries `"done": true`.
#[derive(Debug, Default, PartialEq)]
struct DaemonEvent {
    content: Option<String>,
    error: Option<String>,
    done: bool,
}

impl DaemonEvent {
    /// Blank and malformed lines parse to an empty event.
    fn parse(line: &str) -> Self {
        let Ok(event) = serde_json::from_str::<serde_json::Value>(line.trim()) else {
            return Self::default();
        };
        if let Some(err) = event["error"].as_str() {
            return Self {
                error: Some(err.to_string()),
                ..Self::default()
            };
        }
        Self {
            content: event["message"]["content"]
                .as_str()
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            error: None,
            done: event["done"].as_bool() == Some(true),
        }
    }
}

#[async_trait]
impl LocalEngine for DaemonEngine {
    fn describe(&self) -> String {
        format!("daemon at {}", self.base_url)
    }

    fn generate(&self, model: &str, messages: &[ChatMessage]) -> EngineStream {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });
        let request = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body);

        Box::pin(async_stream::stream! {
            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(anyhow::anyhow!("local engine unreachable: {e}"));
                    return;
                }
            };
            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                yield Err(anyhow::anyhow!("local engine returned HTTP {status}: {text}"));
                return;
            }

            let mut body = resp.bytes_stream();
            let mut lines = LineBuffer::default();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(anyhow::anyhow!("local engine stream error: {e}"));
                        return;
                    }
                };
                for line in lines.push(&bytes) {
                    let event = DaemonEvent::parse(&line);
                    if let Some(content) = event.content {
                        yield Ok(content);
                    }
                    if let Some(err) = event.error {
                        yield Err(anyhow::anyhow!("local engine error: {err}"));
                        return;
                    }
                    if event.done {
                        return;
                    }
                }
            }

            // Final object without a trailing newline
            if let Some(line) = lines.finish() {
                let event = DaemonEvent::parse(&line);
                if let Some(content) = event.content {
                    yield Ok(content);
                }
                if let Some(err) = event.error {
                    yield Err(anyhow::anyhow!("local engine error: {err}"));
                }
            }
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        anyhow::ensure!(
            resp.status().is_success(),
            "local engine unhealthy: HTTP {}",
            resp.status()
        );
        Ok(())
    }
}
