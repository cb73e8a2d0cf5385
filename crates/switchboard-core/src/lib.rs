//! # switchboard-core
//!
//! Core types for the Switchboard completion gateway. This crate defines the
//! shared vocabulary used by every other crate in the workspace: the chat
//! message model and the error taxonomy.

pub mod error;
pub mod message;

pub use error::{AttemptFailure, Result, SwitchboardError};
pub use message::{ChatMessage, Role};
