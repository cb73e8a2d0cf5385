use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use switchboard_config::ProviderConfig;
use switchboard_core::Result;
use tracing::{debug, info, warn};

use crate::local::LocalProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{ChatProvider, WILDCARD_MODEL};

/// Consecutive failures at which a provider stops being selected.
pub const FAILURE_THRESHOLD: u32 = 3;

/// Name of the provider synthesized when nothing is configured.
pub const DEFAULT_PROVIDER_NAME: &str = "local-default";

type Factory = fn(&ProviderConfig) -> Result<Arc<dyn ChatProvider>>;

fn remote_http(cfg: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::new(OpenAiProvider::from_config(cfg)?))
}

fn local(cfg: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::new(LocalProvider::from_config(cfg)?))
}

/// Config `type` tag → constructor.
const FACTORIES: &[(&str, Factory)] = &[
    ("remote-http", remote_http),
    ("openai", remote_http),
    ("local", local),
    ("local-execution", local),
    ("g4f", local),
];

fn factory_for(provider_type: &str) -> Option<Factory> {
    FACTORIES
        .iter()
        .find(|(tag, _)| tag.eq_ignore_ascii_case(provider_type))
        .map(|(_, f)| *f)
}

/// A provider plus the health counter the router maintains for it.
pub struct ProviderSlot {
    provider: Arc<dyn ChatProvider>,
    failures: AtomicU32,
}

impl ProviderSlot {
    fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            failures: AtomicU32::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn is_healthy(&self, threshold: u32) -> bool {
        self.consecutive_failures() < threshold
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }

    /// Returns the new count.
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }
}

/// Health snapshot of one provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub kind: String,
    pub models: Vec<String>,
    pub consecutive_failures: u32,
    pub healthy: bool,
}

/// The ordered, fixed set of providers known to the gateway.
pub struct ProviderRegistry {
    slots: Vec<ProviderSlot>,
    failure_threshold: u32,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        Self {
            slots: providers.into_iter().map(ProviderSlot::new).collect(),
            failure_threshold: FAILURE_THRESHOLD,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Build providers from `[[providers]]` descriptors.
    ///
    /// Unknown types and descriptors that fail to construct are skipped. An
    /// empty or fully disabled list yields a single wildcard local provider.
    pub fn from_config(descriptors: &[ProviderConfig]) -> Self {
        let enabled: Vec<&ProviderConfig> = descriptors.iter().filter(|d| d.enabled).collect();
        for d in descriptors.iter().filter(|d| !d.enabled) {
            debug!(provider = %d.name, "provider disabled, skipping");
        }

        if enabled.is_empty() {
            info!(provider = DEFAULT_PROVIDER_NAME, "no providers configured, using local default");
            let cfg = ProviderConfig::new(DEFAULT_PROVIDER_NAME, "local", &[WILDCARD_MODEL]);
            return match local(&cfg) {
                Ok(p) => Self::new(vec![p]),
                Err(e) => {
                    warn!(error = %e, "failed to build default local provider");
                    Self::new(vec![])
                }
            };
        }

        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(enabled.len());
        for d in enabled {
            if !seen.insert(d.name.as_str()) {
                warn!(provider = %d.name, "duplicate provider name, skipping");
                continue;
            }
            let Some(factory) = factory_for(&d.provider_type) else {
                warn!(provider = %d.name, provider_type = %d.provider_type, "unknown provider type, skipping");
                continue;
            };
            match factory(d) {
                Ok(p) => {
                    info!(provider = %d.name, kind = p.kind(), models = ?d.models, "provider registered");
                    providers.push(p);
                }
                Err(e) => warn!(provider = %d.name, error = %e, "failed to initialize provider, skipping"),
            }
        }
        Self::new(providers)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn slot(&self, index: usize) -> Option<&ProviderSlot> {
        self.slots.get(index)
    }

    pub fn get(&self, name: &str) -> Option<&ProviderSlot> {
        self.slots.iter().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderSlot> {
        self.slots.iter()
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.slots
            .iter()
            .map(|s| ProviderStatus {
                name: s.name().to_string(),
                kind: s.provider.kind().to_string(),
                models: s.provider.models().to_vec(),
                consecutive_failures: s.consecutive_failures(),
                healthy: s.is_healthy(self.failure_threshold),
            })
            .collect()
    }
}
