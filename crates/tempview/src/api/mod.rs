//! HTTP API
//!
//! Routes:
//! - `GET  /Schema/TemporalTables`
//! - `GET  /Schema/TemporalTableByName?schema=&table=`
//! - `GET  /Schema/PrimaryKeys?schema=&table=`
//! - `GET  /Schema/TableColumnsById?tableObjectId=`
//! - `GET  /Schema/TableColumnsByName?schema=&table=`
//! - `POST /TemporalInfo/GetData`
//! - `POST /TemporalInfo/GetDelta`
//! - `POST /TemporalInfo/GetColumnHistory?columnName=`
//! - `GET  /health`

mod error;
mod schema;
mod temporal;

pub use error::ApiError;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tempview_core::TemporalViewerProcessor;
use tempview_db::SchemaRepository;
use tracing::info;

/// Shared handler state.
pub struct AppState {
    processor: TemporalViewerProcessor,
}

impl AppState {
    pub fn new(processor: TemporalViewerProcessor) -> Self {
        Self { processor }
    }

    fn schema(&self) -> &Arc<dyn SchemaRepository> {
        self.processor.schema()
    }
}

pub fn router(processor: TemporalViewerProcessor) -> Router {
    let state = Arc::new(AppState::new(processor));
    Router::new()
        .route("/health", get(health))
        .route("/Schema/TemporalTables", get(schema::temporal_tables))
        .route("/Schema/TemporalTableByName", get(schema::temporal_table_by_name))
        .route("/Schema/PrimaryKeys", get(schema::primary_keys))
        .route("/Schema/TableColumnsById", get(schema::table_columns_by_id))
        .route("/Schema/TableColumnsByName", get(schema::table_columns_by_name))
        .route("/TemporalInfo/GetData", post(temporal::get_data))
        .route("/TemporalInfo/GetDelta", post(temporal::get_delta))
        .route(
            "/TemporalInfo/GetColumnHistory",
            post(temporal::get_column_history),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind and serve until Ctrl+C.
pub async fn serve(bind_addr: &str, processor: TemporalViewerProcessor) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    let local_addr = listener.local_addr().context("Listener has no local address")?;
    info!(addr = %local_addr, "Temporal Viewer API listening");

    axum::serve(listener, router(processor))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Temporal Viewer API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
