//! Query dispatch for repository methods.
//!
//! ```text
//!            QueryMethod (name, parameters, return kind)
//!                             │
//!                             ▼
//!                  ┌─────────────────────┐
//!                  │ QueryLookupStrategy │
//!                  └─────────────────────┘
//!          named SQL? │                 │ otherwise
//!                     ▼                 ▼
//!              ┌──────────┐      ┌──────────────┐
//!              │ SqlQuery │      │ DerivedQuery │
//!              └──────────┘      └──────────────┘
//!     EvaluationContext binds    PartTree parsed, read-all
//!     arguments, find_by_statement   fallback executed
//! ```

mod derived;
mod evaluation;
mod lookup;
mod method;
mod part_tree;
mod sql;

pub use derived::DerivedQuery;
pub use evaluation::EvaluationContext;
pub use lookup::{NamedQueries, QueryLookupStrategy};
pub use method::{QueryMethod, ReturnKind};
pub use part_tree::{Direction, Order, OrPart, Part, PartKind, PartTree, Subject};
pub use sql::SqlQuery;

use crate::core::DataResult;
use crate::mapping::Value;

/// A resolved repository query method.
pub trait RepositoryQuery<T>: Send + Sync {
    /// Run the query with the invocation arguments in declaration order.
    fn execute(&self, parameters: &[Value]) -> DataResult<QueryResult<T>>;

    fn query_method(&self) -> &QueryMethod;
}

/// Outcome of a query method, shaped by its return kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    List(Vec<T>),
    Single(Option<T>),
    Count(i64),
    Exists(bool),
}

impl<T> QueryResult<T> {
    /// Shape materialized entities according to `kind`.
    pub fn from_entities(entities: Vec<T>, kind: ReturnKind) -> Self {
        match kind {
            ReturnKind::Collection => QueryResult::List(entities),
            ReturnKind::Single => QueryResult::Single(entities.into_iter().next()),
            ReturnKind::Count => QueryResult::Count(entities.len() as i64),
            ReturnKind::Exists => QueryResult::Exists(!entities.is_empty()),
        }
    }

    pub fn into_list(self) -> Option<Vec<T>> {
        match self {
            QueryResult::List(entities) => Some(entities),
            _ => None,
        }
    }

    pub fn into_single(self) -> Option<T> {
        match self {
            QueryResult::Single(entity) => entity,
            _ => None,
        }
    }

    pub fn count(&self) -> Option<i64> {
        match self {
            QueryResult::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn exists(&self) -> Option<bool> {
        match self {
            QueryResult::Exists(found) => Some(*found),
            _ => None,
        }
    }
}
