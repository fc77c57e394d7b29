//! `/TemporalInfo/*` handlers: record history for one lookup.
//!
//! A valid result is 200; a result carrying messages is 400 with the same
//! body so clients can show the messages next to the table names.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempview_core::TemporalViewerRequest;

use super::error::ApiError;
use super::AppState;

/// `?columnName=`
#[derive(Debug, Deserialize)]
pub struct ColumnParams {
    #[serde(rename = "columnName", alias = "ColumnName")]
    column_name: Option<String>,
}

fn request_body(
    body: Result<Json<TemporalViewerRequest>, JsonRejection>,
) -> Result<TemporalViewerRequest, ApiError> {
    body.map(|Json(request)| request)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn respond<T: Serialize>(valid: bool, body: T) -> Response {
    let status = if valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(body)).into_response()
}

pub async fn get_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TemporalViewerRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = request_body(body)?;
    let results = state.processor.process(&request).await?;
    Ok(respond(results.is_valid(), results))
}

pub async fn get_delta(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TemporalViewerRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = request_body(body)?;
    let results = state.processor.delta(&request).await?;
    Ok(respond(results.is_valid(), results))
}

pub async fn get_column_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ColumnParams>,
    body: Result<Json<TemporalViewerRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let column_name = params
        .column_name
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'columnName' is required"))?;
    let request = request_body(body)?;
    let results = state
        .processor
        .column_history(&request, &column_name)
        .await?;
    Ok(respond(results.is_valid(), results))
}
