//! Collaborator traits the request processor drives.
//!
//! Both traits are implemented by [`crate::MemoryCatalog`] and, with the
//! `mssql` feature, by `MssqlBackend`.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::HistoryQuery;
use crate::types::{ColumnMetadata, PrimaryKeyColumn, TemporalTable};
use crate::value::RowSnapshot;

/// Schema introspection over the system catalog.
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// Every system-versioned user table.
    async fn temporal_tables(&self) -> Result<Vec<TemporalTable>>;

    /// The temporal table with this base schema and name, if any.
    async fn temporal_table_by_name(&self, schema: &str, table: &str)
        -> Result<Option<TemporalTable>>;

    /// Primary key columns in key order. Empty for an unknown table.
    async fn primary_keys(&self, schema: &str, table: &str) -> Result<Vec<PrimaryKeyColumn>>;

    /// Columns of a table, ordered by column id. Empty for an unknown id.
    async fn table_columns_by_id(&self, object_id: i32) -> Result<Vec<ColumnMetadata>>;

    /// Columns of a table, ordered by column id. Empty for an unknown table.
    async fn table_columns_by_name(&self, schema: &str, table: &str)
        -> Result<Vec<ColumnMetadata>>;
}

/// Executes the union history query for one lookup.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Rows of the base and history tables matching the query's filters,
    /// newest period start first, each in declared column order.
    async fn read_history(&self, query: &HistoryQuery) -> Result<Vec<RowSnapshot>>;
}
