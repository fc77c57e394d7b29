//! Lookup validation.
//!
//! Checks a request's key input against the table's primary key and column
//! types and turns every acceptable entry into a typed [`LookupParam`]. All
//! problems are collected; nothing short-circuits.

use std::collections::HashSet;
use tempview_db::{coerce, ColumnMetadata, LookupParam, PrimaryKeyColumn};

use crate::request::LookupInput;

/// Outcome of [`validate_lookup`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupValidation {
    /// Every primary key column was supplied and every entry coerced.
    pub valid: bool,
    pub params: Vec<LookupParam>,
    pub messages: Vec<String>,
}

pub fn validate_lookup(
    lookup: &[LookupInput],
    table_columns: &[ColumnMetadata],
    primary_keys: &[PrimaryKeyColumn],
) -> LookupValidation {
    let mut result = LookupValidation::default();
    let mut all_keys_present = true;
    let mut all_inputs_valid = true;

    for key in primary_keys {
        if !lookup.iter().any(|input| input.column_name == key.column_name) {
            all_keys_present = false;
            result.messages.push(format!(
                "PK Column {} not in Lookup Input collection.",
                key.column_name
            ));
        }
    }

    let mut seen = HashSet::new();
    for input in lookup {
        if !seen.insert(input.column_name.as_str()) {
            all_inputs_valid = false;
            result.messages.push(format!(
                "Input Lookup column \"{}\" supplied more than once.",
                input.column_name
            ));
            continue;
        }

        let Some(column) = table_columns.iter().find(|c| c.name == input.column_name) else {
            all_inputs_valid = false;
            result.messages.push(format!(
                "Input Lookup column \"{}\" not in Table.",
                input.column_name
            ));
            continue;
        };

        if column.type_name != input.column_type {
            all_inputs_valid = false;
            result.messages.push(format!(
                "Input Lookup column \"{}\" data type different from Table column's datatype.",
                input.column_name
            ));
            continue;
        }

        match coerce(&input.column_name, &input.input_value, &input.column_type) {
            Ok(value) => result.params.push(LookupParam::new(
                input.column_name.clone(),
                input.column_type.clone(),
                value,
            )),
            Err(err) => {
                all_inputs_valid = false;
                result.messages.push(err.to_string());
            }
        }
    }

    result.valid = all_keys_present && all_inputs_valid;
    result
}
