//! Typed stored-attribute values
//!
//! Stored attributes keep their values decoded according to the owning
//! schema's value type. Decoding a raw string either yields a
//! [`StoredValue`] or a rejection reason; reasons are collected by the
//! fill engine, never raised individually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type of a stored schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValueType {
    /// Free-form text.
    #[default]
    String,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    /// `true` / `false`.
    Boolean,
    /// RFC 3339 timestamp.
    Date,
    /// One of an enumerated set of literals.
    Enum,
}

impl AttrValueType {
    /// Decode a raw string into a typed value.
    ///
    /// Enum membership is not checked here; the schema owns the permitted
    /// literal set (see [`StoredSchema::decode`](crate::schema::StoredSchema::decode)).
    pub fn decode(&self, raw: &str) -> Result<StoredValue, String> {
        match self {
            AttrValueType::String => Ok(StoredValue::String(raw.to_string())),
            AttrValueType::Long => raw
                .trim()
                .parse::<i64>()
                .map(StoredValue::Long)
                .map_err(|_| "not a valid integer".to_string()),
            AttrValueType::Double => raw
                .trim()
                .parse::<f64>()
                .map(StoredValue::Double)
                .map_err(|_| "not a valid decimal number".to_string()),
            AttrValueType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(StoredValue::Boolean(true)),
                "false" => Ok(StoredValue::Boolean(false)),
                _ => Err("not a valid boolean".to_string()),
            },
            AttrValueType::Date => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| StoredValue::Date(dt.with_timezone(&Utc)))
                .map_err(|_| "not a valid RFC 3339 date".to_string()),
            AttrValueType::Enum => Ok(StoredValue::Enum(raw.to_string())),
        }
    }
}

impl fmt::Display for AttrValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttrValueType::String => "string",
            AttrValueType::Long => "long",
            AttrValueType::Double => "double",
            AttrValueType::Boolean => "boolean",
            AttrValueType::Date => "date",
            AttrValueType::Enum => "enum",
        };
        write!(f, "{s}")
    }
}

/// A decoded stored-attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    /// Text value.
    String(String),
    /// Integer value.
    Long(i64),
    /// Floating-point value.
    Double(f64),
    /// Boolean value.
    Boolean(bool),
    /// Timestamp value.
    Date(DateTime<Utc>),
    /// Enumerated literal.
    Enum(String),
}

impl StoredValue {
    /// Render the value back to its wire form.
    pub fn as_string(&self) -> String {
        match self {
            StoredValue::String(s) | StoredValue::Enum(s) => s.clone(),
            StoredValue::Long(v) => v.to_string(),
            StoredValue::Double(v) => v.to_string(),
            StoredValue::Boolean(v) => v.to_string(),
            StoredValue::Date(v) => v.to_rfc3339(),
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
