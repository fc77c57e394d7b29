//! `/Schema/*` handlers: catalog introspection.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tempview_db::{ColumnMetadata, PrimaryKeyColumn, TemporalTable};

use super::error::ApiError;
use super::AppState;

/// `?schema=&table=`
#[derive(Debug, Deserialize)]
pub struct TableParams {
    #[serde(alias = "Schema")]
    schema: Option<String>,
    #[serde(alias = "Table")]
    table: Option<String>,
}

impl TableParams {
    fn require(self) -> Result<(String, String), ApiError> {
        match (non_empty(self.schema), non_empty(self.table)) {
            (Some(schema), Some(table)) => Ok((schema, table)),
            _ => Err(ApiError::bad_request(
                "Query parameters 'schema' and 'table' are required",
            )),
        }
    }
}

/// `?tableObjectId=`
#[derive(Debug, Deserialize)]
pub struct ObjectIdParams {
    #[serde(rename = "tableObjectId", alias = "TableObjectId")]
    table_object_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn temporal_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TemporalTable>>, ApiError> {
    Ok(Json(state.schema().temporal_tables().await?))
}

pub async fn temporal_table_by_name(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<TemporalTable>, ApiError> {
    let (schema, table) = params.require()?;
    state
        .schema()
        .temporal_table_by_name(&schema, &table)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Temporal table {}.{} not found", schema, table)))
}

pub async fn primary_keys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<Vec<PrimaryKeyColumn>>, ApiError> {
    let (schema, table) = params.require()?;
    Ok(Json(state.schema().primary_keys(&schema, &table).await?))
}

pub async fn table_columns_by_id(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ObjectIdParams>,
) -> Result<Json<Vec<ColumnMetadata>>, ApiError> {
    let raw = non_empty(params.table_object_id)
        .ok_or_else(|| ApiError::bad_request("Query parameter 'tableObjectId' is required"))?;
    let object_id: i32 = raw.trim().parse().map_err(|_| {
        ApiError::bad_request(format!("tableObjectId must be an integer, got '{}'", raw))
    })?;
    Ok(Json(state.schema().table_columns_by_id(object_id).await?))
}

pub async fn table_columns_by_name(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<Vec<ColumnMetadata>>, ApiError> {
    let (schema, table) = params.require()?;
    Ok(Json(state.schema().table_columns_by_name(&schema, &table).await?))
}
