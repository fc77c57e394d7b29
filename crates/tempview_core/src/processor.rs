//! Request processing.
//!
//! [`TemporalViewerProcessor`] resolves the table, validates the lookup, reads
//! the history and diffs it. Caller mistakes, unknown tables and database
//! failures end up as messages on the result; broken metadata or history
//! ordering is returned as a [`ProcessError`].

use std::sync::Arc;
use tempview_db::{HistoryQuery, HistoryReader, QueryError, ReadHint, SchemaRepository};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::diff::{DiffEngine, DiffError};
use crate::lookup::validate_lookup;
use crate::request::TemporalViewerRequest;
use crate::results::{
    TableNames, TemporalViewerColumnHistoryResults, TemporalViewerDeltaResults,
    TemporalViewerResults,
};

pub const TABLE_NOT_FOUND: &str =
    "Temporal Table Info not found, please verify Schema and Table names.";
pub const COLUMNS_NOT_FOUND: &str =
    "Table Column not found, please verify Schema and Table names.";

/// Configuration or integrity failures. These are not the caller's fault.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Query configuration error: {0}")]
    Query(#[from] QueryError),

    #[error("History integrity error: {0}")]
    Diff(#[from] DiffError),
}

/// Drives one request against a schema repository and a history reader.
#[derive(Clone)]
pub struct TemporalViewerProcessor {
    schema: Arc<dyn SchemaRepository>,
    history: Arc<dyn HistoryReader>,
    read_hint: ReadHint,
}

impl std::fmt::Debug for TemporalViewerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalViewerProcessor")
            .field("read_hint", &self.read_hint)
            .finish_non_exhaustive()
    }
}

impl TemporalViewerProcessor {
    pub fn new(schema: Arc<dyn SchemaRepository>, history: Arc<dyn HistoryReader>) -> Self {
        Self {
            schema,
            history,
            read_hint: ReadHint::default(),
        }
    }

    /// Use one backend for both catalog and history access.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: SchemaRepository + HistoryReader + 'static,
    {
        let shared = Arc::new(backend);
        Self::new(shared.clone(), shared)
    }

    pub fn with_read_hint(mut self, read_hint: ReadHint) -> Self {
        self.read_hint = read_hint;
        self
    }

    pub fn schema(&self) -> &Arc<dyn SchemaRepository> {
        &self.schema
    }

    /// Full result: every row version and the diff matrix.
    pub async fn process(
        &self,
        request: &TemporalViewerRequest,
    ) -> Result<TemporalViewerResults, ProcessError> {
        let mut results = TemporalViewerResults::default();
        info!(
            schema = %request.schema_name,
            table = %request.table_name,
            lookup_columns = request.lookup_info.len(),
            "Processing temporal request"
        );

        let table = match self
            .schema
            .temporal_table_by_name(&request.schema_name, &request.table_name)
            .await
        {
            Ok(Some(table)) => table,
            Ok(None) => {
                results.messages.push(TABLE_NOT_FOUND.to_string());
                return Ok(results);
            }
            Err(err) => {
                warn!(error = %err, "Temporal table lookup failed");
                results.messages.push(err.to_string());
                return Ok(results);
            }
        };
        results.names = TableNames::from(&table);

        let mut columns = match self
            .schema
            .table_columns_by_name(&request.schema_name, &request.table_name)
            .await
        {
            Ok(columns) => columns,
            Err(err) => {
                warn!(error = %err, "Column lookup failed");
                results.messages.push(err.to_string());
                return Ok(results);
            }
        };
        if columns.is_empty() {
            results.messages.push(COLUMNS_NOT_FOUND.to_string());
            return Ok(results);
        }
        columns.sort_by_key(|c| c.ordinal);
        results.table_columns = columns;

        let primary_keys = match self
            .schema
            .primary_keys(&request.schema_name, &request.table_name)
            .await
        {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "Primary key lookup failed");
                results.messages.push(err.to_string());
                return Ok(results);
            }
        };

        let lookup = validate_lookup(&request.lookup_info, &results.table_columns, &primary_keys);
        if !lookup.valid {
            debug!(messages = lookup.messages.len(), "Lookup input rejected");
            results.messages.extend(lookup.messages);
            return Ok(results);
        }

        let query = HistoryQuery::build(
            &results.table_columns,
            &lookup.params,
            table.base_ref(),
            table.history_ref(),
        )?
        .with_read_hint(self.read_hint);
        debug!(sql = %query.to_sql(), "History query assembled");

        let rows = match self.history.read_history(&query).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "History query failed");
                results.messages.push(err.to_string());
                return Ok(results);
            }
        };

        results.diff_inds = DiffEngine::new(&results.table_columns)?.diff_matrix(&rows)?;
        results.history_info = rows;
        info!(
            table = %table.base_ref(),
            versions = results.history_info.len(),
            "Temporal request complete"
        );
        Ok(results)
    }

    /// Delta list for the request's record.
    pub async fn delta(
        &self,
        request: &TemporalViewerRequest,
    ) -> Result<TemporalViewerDeltaResults, ProcessError> {
        let results = self.process(request).await?;
        Ok(TemporalViewerDeltaResults::from_results(&results)?)
    }

    /// History of one column of the request's record.
    pub async fn column_history(
        &self,
        request: &TemporalViewerRequest,
        column_name: &str,
    ) -> Result<TemporalViewerColumnHistoryResults, ProcessError> {
        let results = self.process(request).await?;
        Ok(TemporalViewerColumnHistoryResults::from_results(&results, column_name)?)
    }
}
