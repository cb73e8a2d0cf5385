//! # switchboard-llm
//!
//! Provider abstraction and routing for the Switchboard gateway. Streams chat
//! completions from remote HTTP APIs or local engines, rotating between
//! providers and failing over when one breaks mid-request.

pub mod framing;
pub mod local;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod router;
pub mod session;
pub mod sse;

pub use framing::ChunkEncoder;
pub use local::{DaemonEngine, LocalEngine, LocalProvider};
pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
pub use provider::{ChatProvider, FragmentStream, ModelSet, WILDCARD_MODEL};
pub use registry::{ProviderRegistry, ProviderSlot, ProviderStatus, FAILURE_THRESHOLD};
pub use router::{ProviderRouter, MAX_RETRIES};
pub use session::ChatSession;
