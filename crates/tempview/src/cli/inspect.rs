//! `tempview inspect`: run one request and print the response JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use tempview_core::{TemporalViewerProcessor, TemporalViewerRequest};

use super::SourceArgs;
use crate::backend::build_processor;
use crate::config::AppConfig;

/// Which response shape to produce.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Every version plus the diff matrix (GetData)
    #[default]
    Data,
    /// Changed columns per interval (GetDelta)
    Delta,
    /// History of one column (GetColumnHistory)
    ColumnHistory,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Request body as sent to /TemporalInfo/*
    pub request: PathBuf,

    #[arg(long, value_enum, default_value_t = View::Data)]
    pub view: View,

    /// Column for --view column-history
    #[arg(long, required_if_eq("view", "column-history"))]
    pub column: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub async fn run(args: InspectArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path, args.source.overrides())?;
    let processor = build_processor(&config)?;
    let request = read_request(&args.request)?;

    let (valid, messages, body) =
        render(&processor, &request, args.view, args.column.as_deref()).await?;
    println!("{}", body);

    if !valid {
        bail!("Request is not valid: {}", messages.join(" "));
    }
    Ok(())
}

fn read_request(path: &Path) -> Result<TemporalViewerRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request file: {}", path.display()))
}

/// Returns validity, messages and the pretty-printed response.
pub async fn render(
    processor: &TemporalViewerProcessor,
    request: &TemporalViewerRequest,
    view: View,
    column: Option<&str>,
) -> Result<(bool, Vec<String>, String)> {
    Ok(match view {
        View::Data => {
            let r = processor.process(request).await?;
            (r.is_valid(), r.messages.clone(), serde_json::to_string_pretty(&r)?)
        }
        View::Delta => {
            let r = processor.delta(request).await?;
            (r.is_valid(), r.messages.clone(), serde_json::to_string_pretty(&r)?)
        }
        View::ColumnHistory => {
            let column = column.context("--column is required for --view column-history")?;
            let r = processor.column_history(request, column).await?;
            (r.is_valid(), r.messages.clone(), serde_json::to_string_pretty(&r)?)
        }
    })
}
