//! Command implementations.

pub mod completions;
pub mod config;
pub mod issues;
pub mod projects;
pub mod version;
