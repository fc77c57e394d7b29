//! History query assembly.
//!
//! A [`HistoryQuery`] selects the same projection from the base table and the
//! history table, filters both with the same lookup predicates, unions the two
//! row sets and orders them newest first by the period start column.

use std::collections::HashSet;
use thiserror::Error;

use crate::types::{column_with_role, ColumnMetadata, GenerationRole, LookupParam, RoleLookup, TableRef};
use crate::value::TypedValue;

/// Keywords that cannot appear as bare identifiers.
const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "DATABASE", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "END", "EXEC", "EXISTS", "FILE", "FOR", "FOREIGN", "FROM", "FULL",
    "FUNCTION", "GROUP", "HAVING", "IDENTITY", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS",
    "JOIN", "KEY", "LEFT", "LIKE", "NOT", "NULL", "OF", "ON", "OR", "ORDER", "OUTER", "PERCENT",
    "PLAN", "PRIMARY", "PROCEDURE", "PUBLIC", "REFERENCES", "RIGHT", "RULE", "SCHEMA", "SELECT",
    "SET", "TABLE", "THEN", "TO", "TOP", "TRAN", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "USER",
    "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// Errors building a history query. These are configuration errors: the
/// table metadata does not describe a usable temporal table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Table has no period start column; history cannot be ordered")]
    MissingPeriodStart,

    #[error("Table has more than one period start column")]
    AmbiguousPeriodStart,

    #[error("Table has no columns to select")]
    NoColumns,
}

/// Table hint applied to both table references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadHint {
    /// `WITH (NOLOCK)`: uncommitted read.
    #[default]
    NoLock,
    None,
}

impl ReadHint {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nolock" => Some(ReadHint::NoLock),
            "none" => Some(ReadHint::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadHint::NoLock => "nolock",
            ReadHint::None => "none",
        }
    }
}

/// How parameter placeholders are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `@ColumnName`
    Named,
    /// `@P1`, `@P2`, ... in filter order (what the TDS driver binds).
    Positional,
}

/// One `column = @placeholder` predicate with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub placeholder: String,
    pub value: TypedValue,
}

/// Parameterised union query over a temporal table pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    base: TableRef,
    history: TableRef,
    columns: Vec<String>,
    filters: Vec<Filter>,
    order_column: String,
    read_hint: ReadHint,
}

impl HistoryQuery {
    /// Assemble the query for one lookup.
    ///
    /// An empty `lookup_params` slice produces no WHERE clause at all.
    pub fn build(
        table_columns: &[ColumnMetadata],
        lookup_params: &[LookupParam],
        base: TableRef,
        history: TableRef,
    ) -> Result<Self, QueryError> {
        if table_columns.is_empty() {
            return Err(QueryError::NoColumns);
        }

        let order_column = match column_with_role(table_columns, GenerationRole::PeriodStart) {
            RoleLookup::Found(column) => column.name.clone(),
            RoleLookup::Missing => return Err(QueryError::MissingPeriodStart),
            RoleLookup::Ambiguous => return Err(QueryError::AmbiguousPeriodStart),
        };

        let mut used = HashSet::new();
        let filters = lookup_params
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                let mut placeholder = if is_placeholder_safe(&param.column_name) {
                    param.column_name.clone()
                } else {
                    format!("p{}", idx + 1)
                };
                while !used.insert(placeholder.to_ascii_lowercase()) {
                    placeholder.push('_');
                }
                Filter {
                    column: param.column_name.clone(),
                    placeholder,
                    value: param.value.clone(),
                }
            })
            .collect();

        Ok(Self {
            base,
            history,
            columns: table_columns.iter().map(|c| c.name.clone()).collect(),
            filters,
            order_column,
            read_hint: ReadHint::default(),
        })
    }

    pub fn with_read_hint(mut self, read_hint: ReadHint) -> Self {
        self.read_hint = read_hint;
        self
    }

    pub fn base(&self) -> &TableRef {
        &self.base
    }

    pub fn history(&self) -> &TableRef {
        &self.history
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order_column(&self) -> &str {
        &self.order_column
    }

    pub fn read_hint(&self) -> ReadHint {
        self.read_hint
    }

    /// SQL text with named `@Column` placeholders.
    pub fn to_sql(&self) -> String {
        self.render(ParamStyle::Named)
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> impl Iterator<Item = &TypedValue> {
        self.filters.iter().map(|f| &f.value)
    }

    pub fn render(&self, style: ParamStyle) -> String {
        let projection = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let filter = self.filter_clause(style);

        let mut sql = String::new();
        self.push_select(&mut sql, &projection, &self.base, &filter);
        sql.push_str(" UNION ");
        self.push_select(&mut sql, &projection, &self.history, &filter);
        sql.push_str(&format!(" ORDER BY {} DESC", quote_ident(&self.order_column)));
        sql
    }

    fn push_select(&self, sql: &mut String, projection: &str, table: &TableRef, filter: &str) {
        sql.push_str(&format!(
            "SELECT {} FROM {}.{}",
            projection,
            quote_ident(&table.schema),
            quote_ident(&table.table)
        ));
        if self.read_hint == ReadHint::NoLock {
            sql.push_str(" WITH (NOLOCK)");
        }
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(filter);
        }
    }

    /// `WHERE a = @a AND b = @b`, or empty when there is nothing to filter on.
    pub fn filter_clause(&self, style: ParamStyle) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let predicates = self
            .filters
            .iter()
            .enumerate()
            .map(|(idx, f)| {
                let placeholder = match style {
                    ParamStyle::Named => format!("@{}", f.placeholder),
                    ParamStyle::Positional => format!("@P{}", idx + 1),
                };
                format!("{} = {}", quote_ident(&f.column), placeholder)
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        format!("WHERE {}", predicates)
    }
}

/// Quote an identifier with brackets unless it is a regular identifier.
pub fn quote_ident(name: &str) -> String {
    if is_regular_identifier(name) {
        name.to_string()
    } else {
        format!("[{}]", name.replace(']', "]]"))
    }
}

fn is_regular_identifier(name: &str) -> bool {
    is_placeholder_safe(name) && !RESERVED_WORDS.contains(&name.to_ascii_uppercase().as_str())
}

fn is_placeholder_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '@' | '$' | '#'))
}
