//! Catalog types for temporal tables.
//!
//! Field names on the wire follow the Temporal Viewer API (`columnName`,
//! `generatedType`, ...), so these types are shared by the HTTP layer, the
//! fixture loader and the SQL Server catalog reader.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::TypedValue;

// ============================================================================
// Temporal table descriptors
// ============================================================================

/// A system-versioned table and its history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalTable {
    pub base_schema_name: String,
    pub base_table_name: String,
    #[serde(default)]
    pub base_table_object_id: i32,
    pub history_schema_name: String,
    pub history_table_name: String,
    #[serde(default)]
    pub history_table_object_id: i32,
}

impl TemporalTable {
    /// Reference to the current-state table.
    pub fn base_ref(&self) -> TableRef {
        TableRef::new(&self.base_schema_name, &self.base_table_name)
    }

    /// Reference to the history table.
    pub fn history_ref(&self) -> TableRef {
        TableRef::new(&self.history_schema_name, &self.history_table_name)
    }

    /// Case-sensitive match on the base schema and table name.
    pub fn is_named(&self, schema: &str, table: &str) -> bool {
        self.base_schema_name == schema && self.base_table_name == table
    }
}

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A primary key column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyColumn {
    pub column_name: String,
    pub column_type: String,
}

impl PrimaryKeyColumn {
    pub fn new(column_name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            column_type: column_type.into(),
        }
    }
}

// ============================================================================
// Column metadata
// ============================================================================

/// Role of a column in system versioning (`sys.columns.generated_always_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum GenerationRole {
    #[default]
    Regular,
    /// `GENERATED ALWAYS AS ROW START`
    PeriodStart,
    /// `GENERATED ALWAYS AS ROW END`
    PeriodEnd,
    /// Any other generated-always column (transaction id, sequence number, ...).
    Generated(u8),
}

impl GenerationRole {
    pub fn code(self) -> u8 {
        match self {
            GenerationRole::Regular => 0,
            GenerationRole::PeriodStart => 1,
            GenerationRole::PeriodEnd => 2,
            GenerationRole::Generated(code) => code,
        }
    }
}

impl From<u8> for GenerationRole {
    fn from(code: u8) -> Self {
        match code {
            0 => GenerationRole::Regular,
            1 => GenerationRole::PeriodStart,
            2 => GenerationRole::PeriodEnd,
            other => GenerationRole::Generated(other),
        }
    }
}

impl From<GenerationRole> for u8 {
    fn from(role: GenerationRole) -> Self {
        role.code()
    }
}

/// One column of a table as resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    #[serde(rename = "columnName")]
    pub name: String,
    #[serde(rename = "columnId")]
    pub ordinal: i32,
    #[serde(rename = "columnTypeName")]
    pub type_name: String,
    #[serde(rename = "maxLen", default)]
    pub max_length: i32,
    #[serde(default)]
    pub precision: i32,
    #[serde(default)]
    pub scale: i32,
    #[serde(rename = "isNullable", default)]
    pub is_nullable: bool,
    #[serde(rename = "isIdentity", default)]
    pub is_identity: bool,
    #[serde(rename = "generatedType", default)]
    pub role: GenerationRole,
}

impl ColumnMetadata {
    /// A regular column with only the essentials filled in.
    pub fn new(name: impl Into<String>, ordinal: i32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal,
            type_name: type_name.into(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: false,
            is_identity: false,
            role: GenerationRole::Regular,
        }
    }

    pub fn with_role(mut self, role: GenerationRole) -> Self {
        self.role = role;
        self
    }
}

/// Find the single column carrying `role`, if exactly one exists.
pub fn column_with_role(columns: &[ColumnMetadata], role: GenerationRole) -> RoleLookup<'_> {
    let mut found = columns.iter().filter(|c| c.role == role);
    match (found.next(), found.next()) {
        (None, _) => RoleLookup::Missing,
        (Some(column), None) => RoleLookup::Found(column),
        (Some(_), Some(_)) => RoleLookup::Ambiguous,
    }
}

/// Outcome of [`column_with_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLookup<'a> {
    Found(&'a ColumnMetadata),
    Missing,
    Ambiguous,
}

// ============================================================================
// Lookup parameters
// ============================================================================

/// A validated lookup value, bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupParam {
    pub column_name: String,
    pub column_type: String,
    pub value: TypedValue,
}

impl LookupParam {
    pub fn new(
        column_name: impl Into<String>,
        column_type: impl Into<String>,
        value: TypedValue,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            column_type: column_type.into(),
            value,
        }
    }
}
