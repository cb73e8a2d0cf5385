use async_trait::async_trait;
use std::time::Duration;
use switchboard_config::ProviderConfig;
use switchboard_core::{ChatMessage, Result, SwitchboardError};
use tracing::{debug, info};

use crate::provider::*;
use crate::sse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible API provider (works with OpenAI, Azure, Together, vLLM, etc.)
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
    models: ModelSet,
}

impl OpenAiProvider {
    pub fn new(name: impl Into<String>, api_key: impl Into<String>, models: ModelSet) -> Result<Self> {
        Self::with_timeout(name, api_key, models, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build with a per-attempt timeout covering connect, headers and body.
    pub fn with_timeout(
        name: impl Into<String>,
        api_key: impl Into<String>,
        models: ModelSet,
        timeout: Duration,
    ) -> Result<Self> {
        let provider_name = name.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwitchboardError::provider(&provider_name, e))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            provider_name,
            models,
        })
    }

    /// Use a custom base URL (for Azure, Together, vLLM, etc.)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Build from a `[[providers]]` descriptor.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let timeout = cfg.setting_u64("timeout_secs").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let models: ModelSet = cfg.models.iter().collect();
        let provider = Self::with_timeout(
            cfg.name.clone(),
            cfg.api_key().unwrap_or_default(),
            models,
            Duration::from_secs(timeout),
        )?;
        Ok(match cfg.setting_str("base_url") {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn kind(&self) -> &'static str {
        "remote-http"
    }

    fn models(&self) -> &ModelSet {
        &self.models
    }

    fn stream(&self, model: &str, messages: &[ChatMessage]) -> FragmentStream {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        let mut request = self.client.post(self.endpoint()).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let name = self.provider_name.clone();
        debug!(provider = %name, model, "opening completion stream");

        Box::pin(async_stream::stream! {
            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(SwitchboardError::provider(&name, e));
                    return;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                yield Err(SwitchboardError::provider(&name, format!("HTTP {status}: {text}")));
                return;
            }

            let mut fragments = sse::fragments(name.clone(), resp.bytes_stream());
            while let Some(item) = futures::StreamExt::next(&mut fragments).await {
                yield item;
            }
        })
    }

    async fn health_check(&self) -> Result<()> {
        info!(provider = self.provider_name, "checking API health");
        if self.api_key.is_empty() {
            return Err(SwitchboardError::provider(
                &self.provider_name,
                "API key not set",
            ));
        }
        Ok(())
    }
}
