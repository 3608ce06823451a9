//! Column value model and the declared-type table.
//!
//! Every mapped field resolves, once, to a [`FieldType`]: one of the supported
//! [`ColumnType`] kinds plus whether the field is an `Option`. Reads and writes
//! then dispatch on that closed set instead of inspecting values at runtime.

use std::any::{type_name, Any, TypeId};
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{MappingError, MappingResult};

/// Physical column kinds supported by the mapping layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Bool,
    Date,
    Float64,
    Int64,
    Timestamp,
}

impl ColumnType {
    /// Get the SQL name for this column kind.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Bool => "BOOL",
            ColumnType::Date => "DATE",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::Int64 => "INT64",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// A typed column value as exchanged with the database client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    String(String),
    Bool(bool),
    Date(NaiveDate),
    Float64(f64),
    Int64(i64),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// The column kind of this value, `None` for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ColumnType::String),
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Float64(_) => Some(ColumnType::Float64),
            Value::Int64(_) => Some(ColumnType::Int64),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
        }
    }

    /// Name of the value's kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        self.column_type().map_or("NULL", |t| t.sql_name())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(n) => Some(*n),
            Value::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Float64(n) => write!(f, "{:?}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// The resolved declared type of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    /// Column kind the field binds to.
    pub column_type: ColumnType,
    /// Whether the field is declared as `Option<_>`.
    pub nullable: bool,
    /// Rust type name of the declared field.
    pub type_name: &'static str,
}

impl FieldType {
    /// Resolve the declared type `V` against the supported-type table.
    ///
    /// # Errors
    /// Returns [`MappingError::UnsupportedType`] naming `V` when it is not a
    /// supported column type (or an `Option` of one).
    pub fn of<V: Any>() -> MappingResult<Self> {
        let id = TypeId::of::<V>();
        supported_types()
            .into_iter()
            .find(|(candidate, _, _)| *candidate == id)
            .map(|(_, column_type, nullable)| FieldType {
                column_type,
                nullable,
                type_name: type_name::<V>(),
            })
            .ok_or_else(|| MappingError::unsupported(type_name::<V>()))
    }

    /// Read a field through the table into a column value.
    ///
    /// # Errors
    /// Returns [`MappingError::UnsupportedType`] when the field does not hold
    /// the declared type.
    pub fn read(&self, field: &dyn Any) -> MappingResult<Value> {
        let value = match self.column_type {
            ColumnType::String => read_as::<String>(field, self.nullable),
            ColumnType::Bool => read_as::<bool>(field, self.nullable),
            ColumnType::Date => read_as::<NaiveDate>(field, self.nullable),
            ColumnType::Float64 => read_as::<f64>(field, self.nullable),
            ColumnType::Int64 => read_as::<i64>(field, self.nullable),
            ColumnType::Timestamp => read_as::<DateTime<Utc>>(field, self.nullable),
        };
        value.ok_or_else(|| MappingError::unsupported(self.type_name))
    }

    /// Assign a column value into a field.
    ///
    /// A null value clears an `Option` field and leaves a required field at
    /// its current value.
    ///
    /// # Errors
    /// Returns [`MappingError::TypeMismatch`] when the value kind differs from
    /// the declared kind, [`MappingError::UnsupportedType`] when the field does
    /// not hold the declared type.
    pub fn assign(&self, field: &mut dyn Any, value: Value, column: &str) -> MappingResult<()> {
        let nullable = self.nullable;
        let written = match (self.column_type, value) {
            (ColumnType::String, Value::String(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::String, Value::Null) => write_as::<String>(field, nullable, None),
            (ColumnType::Bool, Value::Bool(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::Bool, Value::Null) => write_as::<bool>(field, nullable, None),
            (ColumnType::Date, Value::Date(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::Date, Value::Null) => write_as::<NaiveDate>(field, nullable, None),
            (ColumnType::Float64, Value::Float64(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::Float64, Value::Null) => write_as::<f64>(field, nullable, None),
            (ColumnType::Int64, Value::Int64(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::Int64, Value::Null) => write_as::<i64>(field, nullable, None),
            (ColumnType::Timestamp, Value::Timestamp(v)) => write_as(field, nullable, Some(v)),
            (ColumnType::Timestamp, Value::Null) => {
                write_as::<DateTime<Utc>>(field, nullable, None)
            }
            (expected, other) => {
                return Err(MappingError::TypeMismatch {
                    column: column.to_string(),
                    expected,
                    found: other.kind_name(),
                })
            }
        };

        if written {
            Ok(())
        } else {
            Err(MappingError::unsupported(self.type_name))
        }
    }
}

fn supported_types() -> [(TypeId, ColumnType, bool); 12] {
    [
        (TypeId::of::<String>(), ColumnType::String, false),
        (TypeId::of::<Option<String>>(), ColumnType::String, true),
        (TypeId::of::<bool>(), ColumnType::Bool, false),
        (TypeId::of::<Option<bool>>(), ColumnType::Bool, true),
        (TypeId::of::<NaiveDate>(), ColumnType::Date, false),
        (TypeId::of::<Option<NaiveDate>>(), ColumnType::Date, true),
        (TypeId::of::<f64>(), ColumnType::Float64, false),
        (TypeId::of::<Option<f64>>(), ColumnType::Float64, true),
        (TypeId::of::<i64>(), ColumnType::Int64, false),
        (TypeId::of::<Option<i64>>(), ColumnType::Int64, true),
        (TypeId::of::<DateTime<Utc>>(), ColumnType::Timestamp, false),
        (TypeId::of::<Option<DateTime<Utc>>>(), ColumnType::Timestamp, true),
    ]
}

fn read_as<V>(field: &dyn Any, nullable: bool) -> Option<Value>
where
    V: Any + Clone + Into<Value>,
{
    if nullable {
        field
            .downcast_ref::<Option<V>>()
            .map(|v| v.clone().map_or(Value::Null, Into::into))
    } else {
        field.downcast_ref::<V>().map(|v| v.clone().into())
    }
}

fn write_as<V: Any>(field: &mut dyn Any, nullable: bool, value: Option<V>) -> bool {
    if nullable {
        match field.downcast_mut::<Option<V>>() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    } else {
        match (field.downcast_mut::<V>(), value) {
            (Some(slot), Some(v)) => {
                *slot = v;
                true
            }
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
