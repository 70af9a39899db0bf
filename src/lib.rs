//! Live issue tracker client.
//!
//! Keeps issue and project views consistent with a REST + server-sent-events
//! backend: pages are fetched over REST, then create/update/delete events are
//! folded into the loaded collection as they arrive.
//!
//! # Architecture
//!
//! - [`stream`] - SSE connections, one per scope, and event decoding
//! - [`view`] - Reconciliation, materialization, pagination, optimistic moves
//! - [`api`] - REST client contracts and the HTTP implementation
//! - [`model`] - Issue, project and page DTOs
//! - [`config`] - Settings from flags, environment and `config.json`
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod stream;
pub mod validate;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
