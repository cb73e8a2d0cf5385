//! # switchboard-config
//!
//! Configuration system for the Switchboard gateway. Reads `switchboard.toml`
//! and applies environment variable overrides on top.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    ConfigWarning, GatewayConfig, LoggingConfig, ProviderConfig, RoutingConfig, WarningSeverity,
};
