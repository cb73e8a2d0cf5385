use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard_config::RoutingConfig;
use switchboard_core::{AttemptFailure, ChatMessage, SwitchboardError};
use tracing::{debug, info, warn};

use crate::provider::{ChatProvider, FragmentStream};
use crate::registry::{ProviderRegistry, ProviderSlot};

/// Maximum attempts per request, before the registry-length cap.
pub const MAX_RETRIES: u32 = 3;

/// Routes chat requests across the registry, with round-robin selection and
/// automatic failover.
///
/// Clones share the registry and the rotation cursor.
#[derive(Clone)]
pub struct ProviderRouter {
    registry: Arc<ProviderRegistry>,
    /// Last slot scanned. Shared by every request, so concurrent traffic
    /// interleaves the rotation; two requests may land on the same slot.
    /// The raw counter is reduced modulo `len` on read and wraps at
    /// `usize::MAX`, which skips the rotation once when `len` is not a power
    /// of two.
    cursor: Arc<AtomicUsize>,
    max_retries: u32,
}

impl ProviderRouter {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            cursor: Arc::new(AtomicUsize::new(0)),
            max_retries: MAX_RETRIES,
        }
    }

    /// Build with the limits from the `[routing]` section.
    pub fn from_routing_config(registry: ProviderRegistry, routing: &RoutingConfig) -> Self {
        let registry = registry.with_failure_threshold(routing.failure_threshold);
        Self::new(registry).with_max_retries(routing.max_retries)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Position the rotation. The next scan starts at `position + 1`.
    pub fn set_cursor(&self, position: usize) {
        self.cursor.store(position, Ordering::Relaxed);
    }

    pub fn cursor(&self) -> usize {
        match self.registry.len() {
            0 => 0,
            len => self.cursor.load(Ordering::Relaxed) % len,
        }
    }

    /// Attempts a single request may make: `max_retries`, capped by the
    /// number of providers so each attempt can land on a distinct one.
    pub fn attempt_budget(&self) -> u32 {
        let len = u32::try_from(self.registry.len()).unwrap_or(u32::MAX);
        self.max_retries.min(len.max(1))
    }

    /// Pick the next healthy provider that serves `model`.
    pub fn select(&self, model: &str) -> Option<Arc<dyn ChatProvider>> {
        self.select_slot(model).map(|slot| Arc::clone(slot.provider()))
    }

    fn select_slot(&self, model: &str) -> Option<&ProviderSlot> {
        let len = self.registry.len();
        let threshold = self.registry.failure_threshold();
        for _ in 0..len {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1) % len;
            let Some(slot) = self.registry.slot(index) else {
                continue;
            };
            if !slot.is_healthy(threshold) {
                debug!(provider = slot.name(), failures = slot.consecutive_failures(), "skipping unhealthy provider");
                continue;
            }
            if slot.provider().models().supports(model) {
                return Some(slot);
            }
        }
        None
    }

    /// Stream a completion, failing over between providers.
    ///
    /// Fragments are forwarded as they arrive. If an attempt fails after
    /// producing output, that output stays delivered and the next provider's
    /// output follows it.
    pub fn stream_chat(&self, model: &str, messages: Vec<ChatMessage>) -> FragmentStream {
        let router = self.clone();
        let model = model.to_string();

        Box::pin(async_stream::stream! {
            let budget = router.attempt_budget();
            let mut failures: Vec<AttemptFailure> = Vec::new();

            for attempt in 1..=budget {
                let Some(slot) = router.select_slot(&model) else {
                    warn!(model = %model, attempt, "no healthy provider available");
                    yield Err(SwitchboardError::NoProviderAvailable { model: model.clone() });
                    return;
                };
                let provider = Arc::clone(slot.provider());
                info!(provider = provider.name(), model = %model, attempt, "routing request");

                let mut fragments = provider.stream(&model, &messages);
                let mut failed = None;
                while let Some(item) = fragments.next().await {
                    match item {
                        Ok(fragment) => {
                            slot.record_success();
                            yield Ok(fragment);
                        }
                        Err(e) => {
                            failed = Some(e);
                            break;
                        }
                    }
                }
                drop(fragments);

                let Some(err) = failed else {
                    debug!(provider = provider.name(), attempt, "completion finished");
                    return;
                };
                let count = slot.record_failure();
                let cause = match err {
                    SwitchboardError::Provider { cause, .. } => cause,
                    other => other.to_string(),
                };
                warn!(provider = provider.name(), failures = count, error = %cause, "provider attempt failed");
                failures.push(AttemptFailure {
                    provider: provider.name().to_string(),
                    error: cause,
                });
            }

            warn!(model = %model, attempts = failures.len(), "all retries failed");
            yield Err(SwitchboardError::AllProvidersFailed { model, failures });
        })
    }
}
