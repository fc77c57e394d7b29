//! CLI commands for the `tempview` binary.

pub mod config;
pub mod inspect;
pub mod serve;

use clap::Args;
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Data source flags shared by `serve` and `inspect`.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON fixture catalog to serve instead of a database
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// ADO connection string for SQL Server
    #[arg(long)]
    pub connection: Option<String>,
}

impl SourceArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: None,
            connection_string: self.connection.clone(),
            fixture: self.fixture.clone(),
        }
    }
}
