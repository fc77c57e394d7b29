//! Temporal Viewer service: configuration, HTTP API and CLI commands.

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
