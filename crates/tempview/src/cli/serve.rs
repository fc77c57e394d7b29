//! `tempview serve`: run the HTTP API.

use anyhow::Result;
use clap::Args;
use std::path::Path;
use tracing::info;

use super::SourceArgs;
use crate::api;
use crate::backend::build_processor;
use crate::config::AppConfig;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default 127.0.0.1:5080)
    #[arg(long)]
    pub bind: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub async fn run(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let mut overrides = args.source.overrides();
    overrides.bind_addr = args.bind;
    let config = AppConfig::load(config_path, overrides)?;
    let processor = build_processor(&config)?;

    info!(
        bind = %config.bind_addr,
        read_hint = config.read_hint.as_str(),
        "Starting Temporal Viewer API"
    );
    api::serve(&config.bind_addr, processor).await
}
