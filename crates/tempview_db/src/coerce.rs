//! Type coercion of textual input into [`TypedValue`]s.
//!
//! Lookup values arrive as strings together with the declared SQL Server type
//! of their column. [`coerce`] parses the string according to that type. All
//! date/time parsing is locale-independent: only ISO-8601 shapes are accepted,
//! so `03/04/2024` is rejected rather than guessed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::value::TypedValue;

/// Date-time shapes tried in order, all ISO-8601 style.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

/// Date-only shapes; the value is taken at midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// SQL Server's own rendering of `datetimeoffset` values.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %:z", "%Y-%m-%d %H:%M %:z"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Declared SQL types that lookup input can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    VarChar,
    NVarChar,
    Text,
    NText,
    UniqueIdentifier,
    Char,
    NChar,
    Int,
    SmallInt,
    TinyInt,
    BigInt,
    Numeric,
    Decimal,
    Money,
    SmallMoney,
    Bit,
    Float,
    Real,
    Date,
    DateTime,
    DateTime2,
    SmallDateTime,
    DateTimeOffset,
    Time,
}

impl SqlType {
    /// Every supported type, in declaration order.
    pub const ALL: &'static [SqlType] = &[
        SqlType::VarChar,
        SqlType::NVarChar,
        SqlType::Text,
        SqlType::NText,
        SqlType::UniqueIdentifier,
        SqlType::Char,
        SqlType::NChar,
        SqlType::Int,
        SqlType::SmallInt,
        SqlType::TinyInt,
        SqlType::BigInt,
        SqlType::Numeric,
        SqlType::Decimal,
        SqlType::Money,
        SqlType::SmallMoney,
        SqlType::Bit,
        SqlType::Float,
        SqlType::Real,
        SqlType::Date,
        SqlType::DateTime,
        SqlType::DateTime2,
        SqlType::SmallDateTime,
        SqlType::DateTimeOffset,
        SqlType::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::VarChar => "varchar",
            SqlType::NVarChar => "nvarchar",
            SqlType::Text => "text",
            SqlType::NText => "ntext",
            SqlType::UniqueIdentifier => "uniqueidentifier",
            SqlType::Char => "char",
            SqlType::NChar => "nchar",
            SqlType::Int => "int",
            SqlType::SmallInt => "smallint",
            SqlType::TinyInt => "tinyint",
            SqlType::BigInt => "bigint",
            SqlType::Numeric => "numeric",
            SqlType::Decimal => "decimal",
            SqlType::Money => "money",
            SqlType::SmallMoney => "smallmoney",
            SqlType::Bit => "bit",
            SqlType::Float => "float",
            SqlType::Real => "real",
            SqlType::Date => "date",
            SqlType::DateTime => "datetime",
            SqlType::DateTime2 => "datetime2",
            SqlType::SmallDateTime => "smalldatetime",
            SqlType::DateTimeOffset => "datetimeoffset",
            SqlType::Time => "time",
        }
    }

    /// Case-insensitive lookup by SQL Server type name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|t| t.as_str() == lower)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a raw input could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Could not parse value for column \"{column}\".  Expected type \"{expected}\", got \"{actual}\".")]
    Unparsable {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Unexpected column type \"{type_name}\" for column \"{column}\" (input \"{actual}\").")]
    UnsupportedType {
        column: String,
        type_name: String,
        actual: String,
    },
}

/// Parse `raw` as a value of the SQL type named `type_name`.
///
/// `column` is only used to build the error message.
pub fn coerce(column: &str, raw: &str, type_name: &str) -> Result<TypedValue, CoercionError> {
    let sql_type = SqlType::from_name(type_name).ok_or_else(|| CoercionError::UnsupportedType {
        column: column.to_string(),
        type_name: type_name.to_string(),
        actual: raw.to_string(),
    })?;

    parse_as(sql_type, raw).ok_or_else(|| CoercionError::Unparsable {
        column: column.to_string(),
        expected: type_name.to_string(),
        actual: raw.to_string(),
    })
}

/// Parse `raw` for an already resolved type; `None` when it does not parse.
pub fn parse_as(sql_type: SqlType, raw: &str) -> Option<TypedValue> {
    match sql_type {
        SqlType::VarChar
        | SqlType::NVarChar
        | SqlType::Text
        | SqlType::NText
        | SqlType::UniqueIdentifier => Some(TypedValue::Text(raw.to_string())),
        SqlType::Char | SqlType::NChar => {
            (raw.chars().count() <= 1).then(|| TypedValue::Text(raw.to_string()))
        }
        // All three narrow integer types accept the 32-bit range.
        SqlType::Int | SqlType::SmallInt | SqlType::TinyInt => raw
            .trim()
            .parse::<i32>()
            .ok()
            .map(|v| TypedValue::Integer(v as i64)),
        SqlType::BigInt => raw.trim().parse::<i64>().ok().map(TypedValue::Integer),
        SqlType::Numeric | SqlType::Decimal | SqlType::Money | SqlType::SmallMoney => {
            Decimal::from_str(raw.trim()).ok().map(TypedValue::Decimal)
        }
        SqlType::Bit => parse_bit(raw).map(TypedValue::Boolean),
        SqlType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Double),
        SqlType::Real => raw
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Single),
        SqlType::Date | SqlType::DateTime | SqlType::DateTime2 | SqlType::SmallDateTime => {
            parse_datetime(raw.trim()).map(TypedValue::DateTime)
        }
        SqlType::DateTimeOffset => parse_datetime_offset(raw.trim()).map(TypedValue::DateTimeOffset),
        SqlType::Time => parse_time(raw.trim()).map(TypedValue::Duration),
    }
}

fn parse_bit(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Offset-bearing input is normalised to UTC.
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn parse_datetime_offset(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    // No offset given: UTC.
    parse_datetime(value).map(|naive| Utc.from_utc_datetime(&naive).into())
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}
