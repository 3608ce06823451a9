//! Write operations sent to the database client.

use std::fmt;

use super::types::{KeySet, Row};
use crate::mapping::Value;

/// Kind of write a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
    Delete,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Insert => "INSERT",
            Op::Update => "UPDATE",
            Op::InsertOrUpdate => "INSERT_OR_UPDATE",
            Op::Replace => "REPLACE",
            Op::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single typed write against one table.
///
/// Value mutations carry column bindings in the order they were set; delete
/// mutations carry a key set instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    table: String,
    op: Op,
    values: Vec<(String, Value)>,
    key_set: Option<KeySet>,
}

impl Mutation {
    pub fn new_insert_builder(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(table, Op::Insert)
    }

    pub fn new_update_builder(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(table, Op::Update)
    }

    pub fn new_insert_or_update_builder(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(table, Op::InsertOrUpdate)
    }

    pub fn new_replace_builder(table: impl Into<String>) -> WriteBuilder {
        WriteBuilder::new(table, Op::Replace)
    }

    /// Delete every row of `table` whose key is in `key_set`.
    pub fn delete(table: impl Into<String>, key_set: KeySet) -> Self {
        Self {
            table: table.into(),
            op: Op::Delete,
            values: Vec::new(),
            key_set: Some(key_set),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Column bindings in binding order. Empty for deletes.
    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    /// Bound column names in binding order.
    pub fn columns(&self) -> Vec<&str> {
        self.values.iter().map(|(c, _)| c.as_str()).collect()
    }

    /// Value bound to a column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Key set of a delete mutation.
    pub fn key_set(&self) -> Option<&KeySet> {
        self.key_set.as_ref()
    }

    /// The bindings as a row, as the client would store them.
    pub fn as_row(&self) -> Row {
        Row::from_pairs(self.values.iter().cloned())
    }
}

/// Accumulates column bindings for a value mutation.
#[derive(Debug, Clone)]
pub struct WriteBuilder {
    table: String,
    op: Op,
    values: Vec<(String, Value)>,
}

impl WriteBuilder {
    fn new(table: impl Into<String>, op: Op) -> Self {
        Self {
            table: table.into(),
            op,
            values: Vec::new(),
        }
    }

    /// Bind a column. Binding the same column twice keeps the last value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
        self
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn build(self) -> Mutation {
        Mutation {
            table: self.table,
            op: self.op,
            values: self.values,
            key_set: None,
        }
    }
}
