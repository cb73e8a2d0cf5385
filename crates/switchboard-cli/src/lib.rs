//! # switchboard-cli
//!
//! Command-line interface for the Switchboard gateway.
//!
//! ## Commands
//!
//! - `switchboard chat` — One-shot or interactive streamed chat
//! - `switchboard providers` — List providers and their health
//! - `switchboard config` — Show the effective configuration
//! - `switchboard doctor` — Audit configuration
//! - `switchboard completions` — Shell completions

pub mod commands;

pub use commands::Cli;
