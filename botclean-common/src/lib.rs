//! # BotClean Common Library
//!
//! Shared code for the BotClean client crates:
//! - Common error type
//! - Configuration loading (ENV → TOML → compiled defaults)
//! - Workflow event types and the event bus
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
