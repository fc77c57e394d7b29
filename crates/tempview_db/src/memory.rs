//! In-memory catalog backed by a JSON fixture.
//!
//! Serves the schema routes and evaluates [`HistoryQuery`] values without a
//! database, which is what the demo server and the integration tests run on.
//!
//! Fixture layout:
//!
//! ```json
//! {"tables": [{
//!     "table": {"baseSchemaName": "dbo", "baseTableName": "Employee", ...},
//!     "columns": [{"columnName": "Id", "columnId": 1, "columnTypeName": "int", ...}],
//!     "primaryKeys": [{"columnName": "Id", "columnType": "int"}],
//!     "currentRows": [{"Id": 1, "Name": "alpha", ...}],
//!     "historyRows": [...]
//! }]}
//! ```
//!
//! Row values are raw JSON and go through the same coercion as lookup input,
//! using each column's declared type.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, debug_span, info};

use crate::coerce::{parse_as, SqlType};
use crate::error::{DbError, Result};
use crate::query::HistoryQuery;
use crate::repository::{HistoryReader, SchemaRepository};
use crate::types::{ColumnMetadata, PrimaryKeyColumn, TemporalTable};
use crate::value::{RowSnapshot, TypedValue};

/// Binary family types; fixtures spell their values as `0x` hex strings.
const BINARY_TYPES: &[&str] = &["binary", "varbinary", "image", "rowversion", "timestamp"];

#[derive(Debug, Deserialize)]
struct FixtureFile {
    tables: Vec<FixtureTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureTable {
    table: TemporalTable,
    columns: Vec<ColumnMetadata>,
    #[serde(default)]
    primary_keys: Vec<PrimaryKeyColumn>,
    #[serde(default)]
    current_rows: Vec<Map<String, Value>>,
    #[serde(default)]
    history_rows: Vec<Map<String, Value>>,
}

/// One temporal table with its metadata and row versions.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub table: TemporalTable,
    /// Ordered by column id.
    pub columns: Vec<ColumnMetadata>,
    pub primary_keys: Vec<PrimaryKeyColumn>,
    pub current_rows: Vec<RowSnapshot>,
    pub history_rows: Vec<RowSnapshot>,
}

/// Schema repository and history reader over fixture data.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already typed entries.
    ///
    /// Object ids left at 0 are assigned so that every table stays
    /// addressable by id.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.push(entry);
        }
        catalog
    }

    pub fn push(&mut self, mut entry: CatalogEntry) {
        let next_id = (self.entries.len() as i32 + 1) * 2;
        if entry.table.base_table_object_id == 0 {
            entry.table.base_table_object_id = next_id - 1;
        }
        if entry.table.history_table_object_id == 0 {
            entry.table.history_table_object_id = next_id;
        }
        entry.columns.sort_by_key(|c| c.ordinal);
        self.entries.push(entry);
    }

    /// Parse a fixture document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: FixtureFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for fixture in file.tables {
            let mut columns = fixture.columns;
            columns.sort_by_key(|c| c.ordinal);
            let table_name = fixture.table.base_ref().to_string();

            let current_rows = fixture
                .current_rows
                .iter()
                .map(|row| typed_row(&table_name, &columns, row))
                .collect::<Result<Vec<_>>>()?;
            let history_rows = fixture
                .history_rows
                .iter()
                .map(|row| typed_row(&table_name, &columns, row))
                .collect::<Result<Vec<_>>>()?;

            catalog.push(CatalogEntry {
                table: fixture.table,
                columns,
                primary_keys: fixture.primary_keys,
                current_rows,
                history_rows,
            });
        }
        Ok(catalog)
    }

    /// Load a fixture file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            tables = catalog.entries.len(),
            "Fixture catalog loaded"
        );
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn entry_by_name(&self, schema: &str, table: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.table.is_named(schema, table))
    }
}

/// Convert one fixture row to a snapshot in declared column order.
fn typed_row(table: &str, columns: &[ColumnMetadata], row: &Map<String, Value>) -> Result<RowSnapshot> {
    if let Some(unknown) = row.keys().find(|k| !columns.iter().any(|c| &c.name == *k)) {
        return Err(DbError::invalid_input(format!(
            "fixture row for {} has unknown column \"{}\"",
            table, unknown
        )));
    }

    let mut snapshot = RowSnapshot::with_capacity(columns.len());
    for column in columns {
        let value = match row.get(&column.name) {
            None | Some(Value::Null) => TypedValue::Null,
            Some(raw) => fixture_value(column, raw).ok_or_else(|| {
                DbError::invalid_input(format!(
                    "fixture value {} for {}.{} is not a valid {}",
                    raw, table, column.name, column.type_name
                ))
            })?,
        };
        snapshot.insert(column.name.clone(), value);
    }
    Ok(snapshot)
}

fn fixture_value(column: &ColumnMetadata, raw: &Value) -> Option<TypedValue> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    let type_name = column.type_name.to_ascii_lowercase();
    if BINARY_TYPES.contains(&type_name.as_str()) {
        let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
        return hex::decode(digits).ok().map(TypedValue::Binary);
    }

    match SqlType::from_name(&type_name)? {
        // Stored char values are padded to their declared width.
        SqlType::Char | SqlType::NChar => Some(TypedValue::Text(text)),
        sql_type => parse_as(sql_type, &text),
    }
}

fn matches_filters(row: &RowSnapshot, query: &HistoryQuery) -> bool {
    query
        .filters()
        .iter()
        .all(|f| row.get(&f.column).is_some_and(|v| *v == f.value))
}

#[async_trait]
impl SchemaRepository for MemoryCatalog {
    async fn temporal_tables(&self) -> Result<Vec<TemporalTable>> {
        Ok(self.entries.iter().map(|e| e.table.clone()).collect())
    }

    async fn temporal_table_by_name(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Option<TemporalTable>> {
        Ok(self.entry_by_name(schema, table).map(|e| e.table.clone()))
    }

    async fn primary_keys(&self, schema: &str, table: &str) -> Result<Vec<PrimaryKeyColumn>> {
        Ok(self
            .entry_by_name(schema, table)
            .map(|e| e.primary_keys.clone())
            .unwrap_or_default())
    }

    async fn table_columns_by_id(&self, object_id: i32) -> Result<Vec<ColumnMetadata>> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.table.base_table_object_id == object_id)
            .map(|e| e.columns.clone())
            .unwrap_or_default())
    }

    async fn table_columns_by_name(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnMetadata>> {
        Ok(self
            .entry_by_name(schema, table)
            .map(|e| e.columns.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl HistoryReader for MemoryCatalog {
    async fn read_history(&self, query: &HistoryQuery) -> Result<Vec<RowSnapshot>> {
        let span = debug_span!(
            "db.query",
            op = "SELECT",
            table = %query.base(),
            rows = tracing::field::Empty,
            duration_ms = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let entry = self
            .entries
            .iter()
            .find(|e| e.table.base_ref() == *query.base() && e.table.history_ref() == *query.history())
            .ok_or_else(|| DbError::not_found(format!("Invalid object name '{}'", query.base())))?;

        for name in query.columns().iter().chain(query.filters().iter().map(|f| &f.column)) {
            if !entry.columns.iter().any(|c| &c.name == name) {
                return Err(DbError::Driver(format!("Invalid column name '{}'", name)));
            }
        }

        let mut rows: Vec<RowSnapshot> = Vec::new();
        for row in entry.current_rows.iter().chain(entry.history_rows.iter()) {
            if !matches_filters(row, query) {
                continue;
            }
            let projected: RowSnapshot = query
                .columns()
                .iter()
                .map(|name| {
                    let value = row.get(name).cloned().unwrap_or(TypedValue::Null);
                    (name.clone(), value)
                })
                .collect();
            // UNION drops duplicate rows.
            if !rows.contains(&projected) {
                rows.push(projected);
            }
        }

        let order = query.order_column();
        rows.sort_by(|a, b| {
            let a = a.get(order).and_then(TypedValue::as_timestamp);
            let b = b.get(order).and_then(TypedValue::as_timestamp);
            b.cmp(&a)
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        span.record("rows", rows.len());
        span.record("duration_ms", duration_ms);
        debug!(rows = rows.len(), "history read from fixture");
        Ok(rows)
    }
}
