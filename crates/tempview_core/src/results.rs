//! Response shapes for the TemporalInfo routes.
//!
//! Each shape carries the table's identifying names, one view of the history
//! and the accumulated messages. `isValid` is serialized alongside and is true
//! exactly when there are no messages.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tempview_db::{ColumnMetadata, RowSnapshot, TemporalTable};

use crate::diff::{ColumnHistoryEntry, DiffEngine, DiffError, DiffInterval};

/// Base and history table names copied into every response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNames {
    pub base_schema_name: String,
    pub base_table_name: String,
    pub history_schema_name: String,
    pub history_table_name: String,
}

impl From<&TemporalTable> for TableNames {
    fn from(table: &TemporalTable) -> Self {
        Self {
            base_schema_name: table.base_schema_name.clone(),
            base_table_name: table.base_table_name.clone(),
            history_schema_name: table.history_schema_name.clone(),
            history_table_name: table.history_table_name.clone(),
        }
    }
}

impl TableNames {
    fn serialize_into<S: SerializeStruct>(&self, state: &mut S) -> Result<(), S::Error> {
        state.serialize_field("baseSchemaName", &self.base_schema_name)?;
        state.serialize_field("baseTableName", &self.base_table_name)?;
        state.serialize_field("historySchemaName", &self.history_schema_name)?;
        state.serialize_field("historyTableName", &self.history_table_name)
    }
}

/// Full result: every row version plus the diff matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalViewerResults {
    pub names: TableNames,
    pub table_columns: Vec<ColumnMetadata>,
    pub history_info: Vec<RowSnapshot>,
    pub diff_inds: Vec<Vec<bool>>,
    pub messages: Vec<String>,
}

impl TemporalViewerResults {
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Serialize for TemporalViewerResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TemporalViewerResults", 9)?;
        self.names.serialize_into(&mut state)?;
        state.serialize_field("tableColumns", &self.table_columns)?;
        state.serialize_field("historyInfo", &self.history_info)?;
        state.serialize_field("diffInds", &self.diff_inds)?;
        state.serialize_field("messages", &self.messages)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.end()
    }
}

/// Delta result: only the intervals where something changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalViewerDeltaResults {
    pub names: TableNames,
    pub table_columns: Vec<ColumnMetadata>,
    pub delta: Vec<DiffInterval>,
    pub messages: Vec<String>,
}

impl TemporalViewerDeltaResults {
    /// Shape a full result. Nothing is diffed when it already carries messages.
    pub fn from_results(results: &TemporalViewerResults) -> Result<Self, DiffError> {
        let delta = if results.is_valid() {
            DiffEngine::new(&results.table_columns)?.delta(&results.history_info)?
        } else {
            Vec::new()
        };
        Ok(Self {
            names: results.names.clone(),
            table_columns: results.table_columns.clone(),
            delta,
            messages: results.messages.clone(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Serialize for TemporalViewerDeltaResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TemporalViewerDeltaResults", 8)?;
        self.names.serialize_into(&mut state)?;
        state.serialize_field("tableColumns", &self.table_columns)?;
        state.serialize_field("delta", &self.delta)?;
        state.serialize_field("messages", &self.messages)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.end()
    }
}

/// Single column result: metadata of the column and its stitched history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalViewerColumnHistoryResults {
    pub names: TableNames,
    pub column_info: Option<ColumnMetadata>,
    pub column_history: Vec<ColumnHistoryEntry>,
    pub messages: Vec<String>,
}

impl TemporalViewerColumnHistoryResults {
    /// Shape a full result for `column_name`.
    ///
    /// A column the table does not have becomes a message, not an error.
    pub fn from_results(results: &TemporalViewerResults, column_name: &str) -> Result<Self, DiffError> {
        let column_info = results
            .table_columns
            .iter()
            .find(|c| c.name == column_name)
            .cloned();
        let mut messages = results.messages.clone();

        let column_history = match (&column_info, results.is_valid()) {
            (Some(_), true) => DiffEngine::new(&results.table_columns)?
                .column_history(&results.history_info, column_name)?,
            (None, true) => {
                messages.push(DiffError::UnknownColumn(column_name.to_string()).to_string());
                Vec::new()
            }
            (_, false) => Vec::new(),
        };

        Ok(Self {
            names: results.names.clone(),
            column_info,
            column_history,
            messages,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Serialize for TemporalViewerColumnHistoryResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TemporalViewerColumnHistoryResults", 8)?;
        self.names.serialize_into(&mut state)?;
        state.serialize_field("columnInfo", &self.column_info)?;
        state.serialize_field("columnHistory", &self.column_history)?;
        state.serialize_field("messages", &self.messages)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.end()
    }
}
