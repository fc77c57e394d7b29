//! Typed column values and row snapshots.
//!
//! Every value read from a temporal table, or parsed from a caller's lookup
//! input, is carried as a [`TypedValue`]. Equality is variant-aware: a
//! `Text("1")` never equals an `Integer(1)`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// `YYYY-MM-DDTHH:MM:SS[.fffffff]`: the fraction is written at `datetime2`
/// precision (100ns) and left off when it is zero.
pub fn format_datetime(value: &NaiveDateTime) -> String {
    with_ticks(value.format("%Y-%m-%dT%H:%M:%S").to_string(), value.nanosecond())
}

/// `HH:MM:SS[.fffffff]`, same precision rule as [`format_datetime`].
pub fn format_time(value: &NaiveTime) -> String {
    with_ticks(value.format("%H:%M:%S").to_string(), value.nanosecond())
}

fn with_ticks(mut text: String, nanosecond: u32) -> String {
    // Leap seconds carry nanosecond >= 1s.
    let ticks = (nanosecond % 1_000_000_000) / 100;
    if ticks != 0 {
        text.push_str(&format!(".{:07}", ticks));
    }
    text
}

/// `serialize_with` helper for timestamp fields of response types.
pub fn serialize_datetime<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_datetime(value))
}

/// A column value after type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
    Single(f32),
    Boolean(bool),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    /// Time of day (`time` columns).
    Duration(NaiveTime),
    /// Raw bytes from binary columns; never produced by lookup coercion.
    Binary(Vec<u8>),
}

impl TypedValue {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Text(_) => "text",
            TypedValue::Integer(_) => "integer",
            TypedValue::Decimal(_) => "decimal",
            TypedValue::Double(_) => "double",
            TypedValue::Single(_) => "single",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::DateTimeOffset(_) => "datetimeoffset",
            TypedValue::Duration(_) => "duration",
            TypedValue::Binary(_) => "binary",
        }
    }

    /// Interpret the value as a period timestamp.
    ///
    /// `DateTimeOffset` values are normalised to UTC; every other variant
    /// yields `None`.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            TypedValue::DateTime(v) => Some(*v),
            TypedValue::DateTimeOffset(v) => Some(v.naive_utc()),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => write!(f, "NULL"),
            TypedValue::Text(v) => write!(f, "{}", v),
            TypedValue::Integer(v) => write!(f, "{}", v),
            TypedValue::Decimal(v) => write!(f, "{}", v),
            TypedValue::Double(v) => write!(f, "{}", v),
            TypedValue::Single(v) => write!(f, "{}", v),
            TypedValue::Boolean(v) => write!(f, "{}", v),
            TypedValue::DateTime(v) => f.write_str(&format_datetime(v)),
            TypedValue::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            TypedValue::Duration(v) => f.write_str(&format_time(v)),
            TypedValue::Binary(v) => write!(f, "0x{}", hex::encode_upper(v)),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TypedValue::Null => serializer.serialize_none(),
            TypedValue::Text(v) => serializer.serialize_str(v),
            TypedValue::Integer(v) => serializer.serialize_i64(*v),
            TypedValue::Double(v) => serializer.serialize_f64(*v),
            TypedValue::Single(v) => serializer.serialize_f32(*v),
            TypedValue::Boolean(v) => serializer.serialize_bool(*v),
            // Decimal goes out as a string so no digits are lost to f64.
            TypedValue::Decimal(_)
            | TypedValue::DateTime(_)
            | TypedValue::DateTimeOffset(_)
            | TypedValue::Duration(_)
            | TypedValue::Binary(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        TypedValue::Integer(v as i64)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Double(v)
    }
}

impl From<Decimal> for TypedValue {
    fn from(v: Decimal) -> Self {
        TypedValue::Decimal(v)
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::Text(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Text(v.to_string())
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Boolean(v)
    }
}

impl From<NaiveDateTime> for TypedValue {
    fn from(v: NaiveDateTime) -> Self {
        TypedValue::DateTime(v)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => TypedValue::Null,
        }
    }
}

/// One retrieved row: column name to value, in declared column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSnapshot {
    entries: Vec<(String, TypedValue)>,
}

impl RowSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Set a column value. An existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: TypedValue) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Builder form of [`RowSnapshot::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, TypedValue)> for RowSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        let mut row = RowSnapshot::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for RowSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_equality_is_variant_aware() {
        assert_ne!(TypedValue::Text("1".into()), TypedValue::Integer(1));
        assert_ne!(TypedValue::Double(1.0), TypedValue::Single(1.0));
        assert_eq!(TypedValue::Integer(7), TypedValue::from(7i32));
    }

    #[test]
    fn test_row_snapshot_keeps_insertion_order() {
        let row = RowSnapshot::new()
            .with("Id", 1i64)
            .with("Name", "alpha")
            .with("Amount", Decimal::from_str("10.50").unwrap());

        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["Id", "Name", "Amount"]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"Id":1,"Name":"alpha","Amount":"10.50"}"#);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut row = RowSnapshot::new().with("A", 1i64).with("B", 2i64);
        row.insert("A", TypedValue::Null);
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(row.get("A"), Some(&TypedValue::Null));
    }

    #[test]
    fn test_serialize_temporal_values() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(10, 15, 0, 250)
            .unwrap();
        let json = serde_json::to_value(TypedValue::DateTime(dt)).unwrap();
        assert_eq!(json, serde_json::json!("2024-03-01T10:15:00.2500000"));

        let midnight = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(TypedValue::DateTime(midnight).to_string(), "2024-03-01T00:00:00");

        let bin = serde_json::to_value(TypedValue::Binary(vec![0xde, 0xad])).unwrap();
        assert_eq!(bin, serde_json::json!("0xDEAD"));

        assert_eq!(serde_json::to_value(TypedValue::Null).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_seven_digit_fractions() {
        let end_of_time =
            NaiveDateTime::parse_from_str("9999-12-31T23:59:59.9999999", "%Y-%m-%dT%H:%M:%S%.f")
                .unwrap();
        assert_eq!(
            serde_json::to_value(TypedValue::DateTime(end_of_time)).unwrap(),
            serde_json::json!("9999-12-31T23:59:59.9999999")
        );

        let time = NaiveTime::parse_from_str("08:30:00.1234567", "%H:%M:%S%.f").unwrap();
        assert_eq!(
            serde_json::to_value(TypedValue::Duration(time)).unwrap(),
            serde_json::json!("08:30:00.1234567")
        );
        assert_eq!(format_time(&NaiveTime::from_hms_opt(8, 30, 0).unwrap()), "08:30:00");
    }

    #[test]
    fn test_as_timestamp_normalises_offsets() {
        let dto = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+02:00").unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(TypedValue::DateTimeOffset(dto).as_timestamp(), Some(expected));
        assert_eq!(TypedValue::Integer(1).as_timestamp(), None);
    }
}
