//! Property values carried by nodes and relationships

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::model::{FieldValue, Row, DATE_FORMAT, TIMESTAMP_FORMAT};

/// A single property value
///
/// Nested record fields (lists and maps) are stored as JSON-encoded strings,
/// so a property is always a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            PropertyValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Date(_) => "Date",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Null => "Null",
        }
    }

    /// Plain text form used for unique keys
    pub fn key_text(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            PropertyValue::DateTime(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<NaiveDate> for PropertyValue {
    fn from(d: NaiveDate) -> Self {
        PropertyValue::Date(d)
    }
}

impl From<&FieldValue> for PropertyValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => PropertyValue::Null,
            FieldValue::Text(s) => PropertyValue::String(s.clone()),
            FieldValue::Integer(i) => PropertyValue::Integer(*i),
            FieldValue::Real(f) => PropertyValue::Float(*f),
            FieldValue::Bool(b) => PropertyValue::Boolean(*b),
            FieldValue::Date(d) => PropertyValue::Date(*d),
            FieldValue::Timestamp(ts) => PropertyValue::DateTime(*ts),
            FieldValue::Json(v) => PropertyValue::String(v.to_string()),
        }
    }
}

/// Property map for nodes and relationships
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Properties of a record row; null columns are left out
pub fn properties_from_row(row: &Row) -> PropertyMap {
    row.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(column, value)| (column.to_string(), PropertyValue::from(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_conversion() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 17).unwrap();
        assert_eq!(PropertyValue::from(&FieldValue::Date(date)).as_date(), Some(date));
        assert_eq!(PropertyValue::from(&FieldValue::Real(2.5)).as_float(), Some(2.5));
        assert_eq!(
            PropertyValue::from(&FieldValue::Json(json!(["a", "b"]))).as_string(),
            Some(r#"["a","b"]"#)
        );
    }

    #[test]
    fn test_row_properties_skip_nulls() {
        let row = Row::new()
            .text("account_id", "abc")
            .opt_text("notes", None)
            .boolean("is_debit", true);
        let props = properties_from_row(&row);
        assert_eq!(props.len(), 2);
        assert_eq!(props["account_id"].key_text(), "abc");
        assert_eq!(props["is_debit"].as_boolean(), Some(true));
    }

    #[test]
    fn test_key_text() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(PropertyValue::Date(date).key_text(), "2021-01-02");
        assert_eq!(PropertyValue::from("US").key_text(), "US");
        assert_eq!(PropertyValue::Integer(3).type_name(), "Integer");
    }
}
