//! botclean-client library
//!
//! Upload-to-results pipeline for the bot-cleaning service: parse a CSV
//! upload, infer and validate the column mapping, submit it for
//! classification, then read the returned result bundle.

pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{WorkflowError, WorkflowResult};
