//! Repository query method metadata.

use crate::mapping::{simple_type_name, Entity};

/// What a query method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Every matching entity.
    Collection,
    /// The first matching entity, if any.
    Single,
    /// The number of matching rows.
    Count,
    /// Whether any row matches.
    Exists,
}

/// A repository method as seen by query resolution.
///
/// Computed once when the repository resolves the method, then shared by
/// every execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMethod {
    name: String,
    parameters: Vec<String>,
    return_kind: ReturnKind,
    domain_type: &'static str,
}

impl QueryMethod {
    /// Describe method `name` of a repository over `T`, with its parameter
    /// names in declaration order.
    pub fn new<T: Entity>(name: &str, parameters: &[&str], return_kind: ReturnKind) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            return_kind,
            domain_type: simple_type_name::<T>(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn return_kind(&self) -> ReturnKind {
        self.return_kind
    }

    /// Unqualified name of the entity the repository manages.
    pub fn domain_type(&self) -> &'static str {
        self.domain_type
    }

    /// Name a named query for this method is registered under.
    pub fn named_query_name(&self) -> String {
        format!("{}.{}", self.domain_type, self.name)
    }
}
