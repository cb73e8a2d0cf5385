use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::BTreeSet;
use switchboard_core::{ChatMessage, Result};

/// Model id that makes a provider accept any requested model.
pub const WILDCARD_MODEL: &str = "*";

/// A lazy, finite sequence of non-empty text fragments.
///
/// Dropping the stream releases whatever connection backs it.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// The set of models a provider serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSet {
    models: BTreeSet<String>,
    wildcard: bool,
}

impl ModelSet {
    /// A set that accepts every model.
    pub fn any() -> Self {
        Self {
            models: BTreeSet::new(),
            wildcard: true,
        }
    }

    pub fn supports(&self, model: &str) -> bool {
        self.wildcard || self.models.contains(model)
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Model ids in display form (`*` included when present).
    pub fn to_vec(&self) -> Vec<String> {
        let mut out: Vec<String> = self.models.iter().cloned().collect();
        if self.wildcard {
            out.push(WILDCARD_MODEL.to_string());
        }
        out
    }
}

impl<S: AsRef<str>> FromIterator<S> for ModelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ModelSet::default();
        for m in iter {
            let m = m.as_ref().trim();
            if m == WILDCARD_MODEL {
                set.wildcard = true;
            } else if !m.is_empty() {
                set.models.insert(m.to_string());
            }
        }
        set
    }
}

/// Trait implemented by each backend (remote HTTP, local engine, mock).
///
/// Providers do not track their own health: the router records outcomes on
/// the registry slot that owns the provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Unique name, e.g. "openai" or "local-default".
    fn name(&self) -> &str;

    /// Backend kind label, e.g. "remote-http", "local".
    fn kind(&self) -> &'static str;

    /// Models this provider accepts.
    fn models(&self) -> &ModelSet;

    /// Stream a chat completion. Errors (including ones raised after some
    /// fragments were produced) arrive as `Err` items; the stream ends after
    /// the first error.
    fn stream(&self, model: &str, messages: &[ChatMessage]) -> FragmentStream;

    /// Check if this provider is reachable / usable.
    async fn health_check(&self) -> Result<()>;
}
