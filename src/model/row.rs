//! Flat column/value view of a record
//!
//! Every record kind renders itself into a [`Row`]: an ordered map from column
//! name to [`FieldValue`]. The validation rules, the relational upsert, the graph
//! property mapping and the CSV export all read records through this view.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt;

/// Canonical date format used in every store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical timestamp format used in every store
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Nested map or list, stored as JSON
    Json(JsonValue),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view of integer and real values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            FieldValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Real(_) => "real",
            FieldValue::Bool(_) => "bool",
            FieldValue::Date(_) => "date",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Json(_) => "json",
        }
    }
}

impl fmt::Display for FieldValue {
    /// Renders the value the way it is written to text-based stores
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Ordered column map for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: IndexMap<&'static str, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: FieldValue) -> Self {
        self.fields.insert(column, value);
        self
    }

    pub fn text(self, column: &'static str, value: impl Into<String>) -> Self {
        self.set(column, FieldValue::Text(value.into()))
    }

    pub fn opt_text(self, column: &'static str, value: Option<&str>) -> Self {
        let value = value.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()));
        self.set(column, value)
    }

    pub fn integer(self, column: &'static str, value: i64) -> Self {
        self.set(column, FieldValue::Integer(value))
    }

    pub fn opt_integer(self, column: &'static str, value: Option<i64>) -> Self {
        self.set(column, value.map_or(FieldValue::Null, FieldValue::Integer))
    }

    pub fn real(self, column: &'static str, value: f64) -> Self {
        self.set(column, FieldValue::Real(value))
    }

    pub fn boolean(self, column: &'static str, value: bool) -> Self {
        self.set(column, FieldValue::Bool(value))
    }

    pub fn date(self, column: &'static str, value: NaiveDate) -> Self {
        self.set(column, FieldValue::Date(value))
    }

    pub fn opt_date(self, column: &'static str, value: Option<NaiveDate>) -> Self {
        self.set(column, value.map_or(FieldValue::Null, FieldValue::Date))
    }

    pub fn timestamp(self, column: &'static str, value: NaiveDateTime) -> Self {
        self.set(column, FieldValue::Timestamp(value))
    }

    pub fn opt_timestamp(self, column: &'static str, value: Option<NaiveDateTime>) -> Self {
        self.set(column, value.map_or(FieldValue::Null, FieldValue::Timestamp))
    }

    pub fn json(self, column: &'static str, value: JsonValue) -> Self {
        self.set(column, FieldValue::Json(value))
    }

    /// Value of a column, `None` when the column is absent
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// Value of a column, treating an absent column as null
    pub fn value(&self, column: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::new()
            .text("id", "a")
            .integer("count", 3)
            .boolean("active", true);
        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, vec!["id", "count", "active"]);
    }

    #[test]
    fn test_optional_columns_are_null() {
        let row = Row::new().opt_text("notes", None).opt_date("ends", None);
        assert!(row.value("notes").is_null());
        assert!(row.value("ends").is_null());
        assert!(row.value("missing").is_null());
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_display_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(FieldValue::Date(date).to_string(), "2024-02-29");
        assert_eq!(FieldValue::Json(json!({"a": 1})).to_string(), r#"{"a":1}"#);
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::Integer(7).as_f64(), Some(7.0));
    }
}
