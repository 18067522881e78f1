//! Records — typed rows for the dynamically-columned data tables.
//!
//! DESIGN
//! ======
//! Backend collections (users, payments, reports) have no fixed schema. A
//! [`Record`] keeps the backend's field order and tags every value as a
//! scalar. Column descriptors are derived once from the first row, and edits
//! coming back from a table are plain strings that are cast against those
//! descriptors before anything is written.
//!
//! Every field also keeps the JSON it arrived as. Write-back sends that
//! untouched unless the field was edited, so a date-only string stays
//! date-only and nested objects stay objects. `_id` becomes `id`; `__v` is
//! dropped.

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;

use std::fmt;

use serde_json::{Map, Number, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const ID_FIELD: &str = "id";
const BACKEND_ID_FIELD: &str = "_id";
const VERSION_FIELD: &str = "__v";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("expected a JSON array of records, got {0}")]
    NotAList(&'static str),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' is read-only")]
    ReadOnlyField(String),
    #[error("invalid {kind} value for '{field}': '{value}'")]
    InvalidValue { field: String, kind: ColumnKind, value: String },
}

// =============================================================================
// VALUES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Text(String),
    Number(Number),
    Date(OffsetDateTime),
    Bool(bool),
    /// Nested object or array, shown as compact JSON.
    Json(Value),
    Null,
}

impl ScalarValue {
    /// Tag a JSON value. Strings that parse as RFC 3339 timestamps or
    /// `YYYY-MM-DD` dates become [`ScalarValue::Date`].
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => parse_date(s).map_or_else(|| Self::Text(s.clone()), Self::Date),
            Value::Array(_) | Value::Object(_) => Self::Json(value.clone()),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Date(at) => at
                .format(&Rfc3339)
                .map_or(Value::Null, Value::String),
            Self::Bool(b) => Value::Bool(*b),
            Self::Json(value) => value.clone(),
            Self::Null => Value::Null,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Text(_) => Some(ColumnKind::Text),
            Self::Number(_) => Some(ColumnKind::Number),
            Self::Date(_) => Some(ColumnKind::Date),
            Self::Bool(_) => Some(ColumnKind::Bool),
            Self::Json(_) => Some(ColumnKind::Json),
            Self::Null => None,
        }
    }

    /// Parse table input for a column of the given kind. Blank input is
    /// `Null` for every kind except text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidValue`] if `raw` does not fit `kind`.
    pub fn cast(field: &str, kind: ColumnKind, raw: &str) -> Result<Self, RecordError> {
        let trimmed = raw.trim();
        if kind == ColumnKind::Text {
            return Ok(Self::Text(raw.to_owned()));
        }
        if trimmed.is_empty() {
            return Ok(Self::Null);
        }
        let parsed = match kind {
            ColumnKind::Number => trimmed.parse::<Number>().ok().map(Self::Number),
            ColumnKind::Date => parse_date(trimmed).map(Self::Date),
            ColumnKind::Bool => crate::config::parse_bool(trimmed).map(Self::Bool),
            ColumnKind::Json => serde_json::from_str::<Value>(trimmed)
                .ok()
                .filter(|v| v.is_array() || v.is_object())
                .map(Self::Json),
            ColumnKind::Text => None,
        };
        parsed.ok_or_else(|| RecordError::InvalidValue { field: field.to_owned(), kind, value: raw.to_owned() })
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(at) => write!(f, "{}", at.date()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Json(value) => write!(f, "{value}"),
            Self::Null => Ok(()),
        }
    }
}

fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

// =============================================================================
// COLUMNS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    Bool,
    Json,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Bool => "boolean",
            Self::Json => "JSON",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    /// Display label: underscores become spaces, words are capitalized.
    pub header: String,
    pub kind: ColumnKind,
}

/// Describe the columns of a collection from its first row. The id column is
/// left out; a null first value is treated as text.
#[must_use]
pub fn derive_columns(first: &Record) -> Vec<Column> {
    first
        .fields()
        .filter(|(field, _)| *field != ID_FIELD)
        .map(|(field, value)| Column {
            field: field.to_owned(),
            header: header_for(field),
            kind: value.kind().unwrap_or(ColumnKind::Text),
        })
        .collect()
}

fn header_for(field: &str) -> String {
    field
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |c| c.to_uppercase().chain(chars).collect())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// RECORD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    name: String,
    value: ScalarValue,
    /// What write-back sends for this field.
    wire: Value,
}

/// One row: ordered `field → value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] for anything but a JSON object.
    pub fn from_json(value: &Value) -> Result<Self, RecordError> {
        let Value::Object(map) = value else {
            return Err(RecordError::NotAnObject(json_kind(value)));
        };
        let fields = map
            .iter()
            .filter(|(key, _)| key.as_str() != VERSION_FIELD)
            .map(|(key, value)| {
                let name = if key == BACKEND_ID_FIELD { ID_FIELD } else { key.as_str() };
                Field { name: name.to_owned(), value: ScalarValue::from_json(value), wire: value.clone() }
            })
            .collect();
        Ok(Self { fields })
    }

    /// Parse a collection response (a bare JSON array of objects).
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an array or an element is not an object.
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>, RecordError> {
        let Value::Array(rows) = value else {
            return Err(RecordError::NotAList(json_kind(value)));
        };
        rows.iter().map(Self::from_json).collect()
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self.get(ID_FIELD)? {
            ScalarValue::Text(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ScalarValue> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| &f.value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), &f.value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set `field`, appending it if new.
    pub fn set(&mut self, field: &str, value: ScalarValue) {
        let wire = value.to_json();
        self.put(field, value, wire);
    }

    fn put(&mut self, field: &str, value: ScalarValue, wire: Value) {
        match self.fields.iter_mut().find(|f| f.name == field) {
            Some(slot) => {
                slot.value = value;
                slot.wire = wire;
            }
            None => self.fields.push(Field { name: field.to_owned(), value, wire }),
        }
    }

    /// Apply string edits from a table, cast against `columns`.
    ///
    /// Nothing is applied unless every edit is valid. A date is written back
    /// the way it was typed once it parses.
    ///
    /// # Errors
    ///
    /// Returns an error for edits to `id`, to fields with no column, or with
    /// values that do not fit the column kind.
    pub fn cast_for_write<'a, I>(&self, columns: &[Column], edits: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut updated = self.clone();
        for (field, raw) in edits {
            if field == ID_FIELD {
                return Err(RecordError::ReadOnlyField(field.to_owned()));
            }
            let column = columns
                .iter()
                .find(|c| c.field == field)
                .ok_or_else(|| RecordError::UnknownField(field.to_owned()))?;
            let value = ScalarValue::cast(field, column.kind, raw)?;
            let wire = match value {
                ScalarValue::Date(_) => Value::String(raw.trim().to_owned()),
                _ => value.to_json(),
            };
            updated.put(field, value, wire);
        }
        Ok(updated)
    }

    /// JSON object for the backend. The id is left out; it travels in the URL.
    #[must_use]
    pub fn to_write_body(&self) -> Value {
        let body: Map<String, Value> = self
            .fields
            .iter()
            .filter(|f| f.name != ID_FIELD)
            .map(|f| (f.name.clone(), f.wire.clone()))
            .collect();
        Value::Object(body)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
