//! Catalog and query layer for Temporal Viewer
//!
//! Everything that touches a temporal table's data lives here: the typed value
//! model, lookup-input coercion, catalog metadata, the history query builder and
//! the two backends that answer catalog and history requests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tempview_db::{HistoryQuery, HistoryReader, MemoryCatalog, SchemaRepository};
//!
//! let catalog = MemoryCatalog::from_path("fixtures/demo.json")?;
//! let table = catalog.temporal_table_by_name("dbo", "Employee").await?.unwrap();
//! let columns = catalog.table_columns_by_id(table.base_table_object_id).await?;
//!
//! let query = HistoryQuery::build(&columns, &params, table.base_ref(), table.history_ref())?;
//! let rows = catalog.read_history(&query).await?;
//! ```
//!
//! # Features
//!
//! - `mssql`: SQL Server backend over tiberius

pub mod coerce;
mod error;
mod memory;
pub mod query;
mod repository;
mod types;
mod value;

#[cfg(feature = "mssql")]
mod mssql;

pub use coerce::{coerce, CoercionError, SqlType};
pub use error::{DbError, Result};
pub use memory::{CatalogEntry, MemoryCatalog};
pub use query::{HistoryQuery, ParamStyle, QueryError, ReadHint};
pub use repository::{HistoryReader, SchemaRepository};
pub use types::*;
pub use value::{format_datetime, format_time, serialize_datetime, RowSnapshot, TypedValue};

#[cfg(feature = "mssql")]
pub use mssql::MssqlBackend;
