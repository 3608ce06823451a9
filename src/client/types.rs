//! Value types exchanged with the database client.

use std::collections::BTreeMap;
use std::fmt;

use crate::mapping::Value;

/// A primary key: one value per key column.
#[derive(Debug, Clone, PartialEq)]
pub struct Key(Vec<Value>);

impl Key {
    /// Single-column key.
    pub fn of(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Composite key from its parts, in key-column order.
    pub fn from_parts<I, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, "]")
    }
}

/// A set of keys, or the whole key space of a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeySet {
    keys: Vec<Key>,
    all: bool,
}

impl KeySet {
    /// An empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full key space.
    pub fn all() -> Self {
        Self {
            keys: Vec::new(),
            all: true,
        }
    }

    /// A key set holding one key.
    pub fn singleton(key: Key) -> Self {
        Self {
            keys: vec![key],
            all: false,
        }
    }

    pub fn add_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    /// True when the set selects no rows at all.
    pub fn is_empty(&self) -> bool {
        !self.all && self.keys.is_empty()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.all || self.keys.contains(key)
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
            all: false,
        }
    }
}

/// A row returned by the client, addressable by position and by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |row, (column, value)| row.with(column, value))
    }

    /// Append or replace a column value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column.into(), value.into());
        self
    }

    pub(crate) fn set(&mut self, column: String, value: Value) {
        match self.columns.iter().position(|c| *c == column) {
            Some(i) => self.values[i] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Value of a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value of a column by position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 64-bit integer at a position.
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.get_index(index).and_then(Value::as_i64)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// The subset of this row's columns named in `columns`, in that order.
    /// Columns missing from the row are skipped.
    pub fn project(&self, columns: &[&str]) -> Row {
        let mut row = Row::new();
        for column in columns {
            if let Some(value) = self.get(column) {
                row.set((*column).to_string(), value.clone());
            }
        }
        row
    }
}

/// Rows produced by a read or a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// A SQL statement with named parameters (`@name`).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: BTreeMap<String, Value>,
}

impl Statement {
    /// A statement without parameters.
    pub fn of(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind a named parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Options for key-based reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Secondary index to read through.
    pub index: Option<String>,
}

impl ReadOptions {
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }
}

/// Options for statement execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Number of result chunks to prefetch.
    pub prefetch_chunks: Option<u32>,
}
