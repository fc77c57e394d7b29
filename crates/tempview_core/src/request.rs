//! Request body shared by the TemporalInfo routes.

use serde::{Deserialize, Serialize};

/// Identifies one record of a temporal table by its key values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalViewerRequest {
    #[serde(default, alias = "SchemaName")]
    pub schema_name: String,
    #[serde(default, alias = "TableName")]
    pub table_name: String,
    #[serde(default, alias = "LookupInfo")]
    pub lookup_info: Vec<LookupInput>,
}

impl TemporalViewerRequest {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            lookup_info: Vec::new(),
        }
    }

    /// Builder: add one lookup column.
    pub fn lookup(
        mut self,
        column_name: impl Into<String>,
        column_type: impl Into<String>,
        input_value: impl Into<String>,
    ) -> Self {
        self.lookup_info.push(LookupInput {
            column_name: column_name.into(),
            column_type: column_type.into(),
            input_value: input_value.into(),
        });
        self
    }
}

/// One untyped lookup value as the caller sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupInput {
    #[serde(default, alias = "ColumnName")]
    pub column_name: String,
    #[serde(default, alias = "ColumnType")]
    pub column_type: String,
    #[serde(default, alias = "InputValue")]
    pub input_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_camel_and_pascal_case() {
        let camel: TemporalViewerRequest = serde_json::from_str(
            r#"{"schemaName":"dbo","tableName":"Employee",
                "lookupInfo":[{"columnName":"Id","columnType":"int","inputValue":"1"}]}"#,
        )
        .unwrap();
        let pascal: TemporalViewerRequest = serde_json::from_str(
            r#"{"SchemaName":"dbo","TableName":"Employee",
                "LookupInfo":[{"ColumnName":"Id","ColumnType":"int","InputValue":"1"}]}"#,
        )
        .unwrap();
        assert_eq!(camel, pascal);
        assert_eq!(camel, TemporalViewerRequest::new("dbo", "Employee").lookup("Id", "int", "1"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request: TemporalViewerRequest = serde_json::from_str("{}").unwrap();
        assert!(request.schema_name.is_empty());
        assert!(request.lookup_info.is_empty());
    }
}
