//! Data layer configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{DataError, DataResult};
use crate::mapping::{FieldNamingStrategy, MappingContext, PropertyNameStrategy, SnakeCaseStrategy};

/// Built-in naming strategies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategyKind {
    /// Column name equals the field name.
    #[default]
    PropertyName,
    /// `traderId` maps to `trader_id`.
    SnakeCase,
}

impl NamingStrategyKind {
    pub fn strategy(self) -> Arc<dyn FieldNamingStrategy> {
        match self {
            NamingStrategyKind::PropertyName => Arc::new(PropertyNameStrategy),
            NamingStrategyKind::SnakeCase => Arc::new(SnakeCaseStrategy),
        }
    }
}

/// How repository query methods are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLookupKind {
    /// Always derive the query from the method name.
    Create,
    /// Only use named SQL; a method without one is an error.
    UseDeclaredQuery,
    /// Use named SQL when registered, derive otherwise.
    #[default]
    CreateIfNotFound,
}

/// Data layer configuration options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Naming strategy for properties without a column override.
    pub naming_strategy: NamingStrategyKind,
    /// Query method resolution strategy.
    pub query_lookup: QueryLookupKind,
    /// Named SQL keyed by query name (`Entity.method`).
    pub named_queries: BTreeMap<String, String>,
    /// Limit for key-set reads issued without one.
    pub default_read_limit: Option<u64>,
}

impl DataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> DataResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| DataError::invalid_argument(format!("invalid configuration: {}", err)))
    }

    /// Set the naming strategy.
    pub fn naming_strategy(mut self, kind: NamingStrategyKind) -> Self {
        self.naming_strategy = kind;
        self
    }

    /// Set the query lookup strategy.
    pub fn query_lookup(mut self, kind: QueryLookupKind) -> Self {
        self.query_lookup = kind;
        self
    }

    /// Register a named SQL query.
    pub fn named_query(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.named_queries.insert(name.into(), sql.into());
        self
    }

    /// Set the default read limit.
    pub fn default_read_limit(mut self, limit: u64) -> Self {
        self.default_read_limit = Some(limit);
        self
    }

    /// A mapping context using the configured naming strategy.
    pub fn mapping_context(&self) -> MappingContext {
        MappingContext::with_naming_strategy(self.naming_strategy.strategy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DataConfig::default();
        assert_eq!(config.naming_strategy, NamingStrategyKind::PropertyName);
        assert_eq!(config.query_lookup, QueryLookupKind::CreateIfNotFound);
        assert!(config.named_queries.is_empty());
        assert_eq!(config.default_read_limit, None);
    }

    #[test]
    fn test_from_json() {
        let config = DataConfig::from_json(
            r#"{
                "naming_strategy": "snake_case",
                "query_lookup": "use_declared_query",
                "named_queries": { "Trader.findByName": "SELECT * FROM trader WHERE name = @name" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.naming_strategy, NamingStrategyKind::SnakeCase);
        assert_eq!(config.query_lookup, QueryLookupKind::UseDeclaredQuery);
        assert_eq!(config.named_queries.len(), 1);

        let err = DataConfig::from_json(r#"{ "query_lookup": "guess" }"#).unwrap_err();
        assert!(matches!(err, DataError::InvalidArgument(_)));
    }

    #[test]
    fn test_builder_and_json_round_trip() {
        let config = DataConfig::new()
            .naming_strategy(NamingStrategyKind::SnakeCase)
            .named_query("Trade.findBySymbol", "SELECT * FROM Trade WHERE symbol = @symbol")
            .default_read_limit(100);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(DataConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_mapping_context_uses_strategy() {
        let context = DataConfig::new()
            .naming_strategy(NamingStrategyKind::SnakeCase)
            .mapping_context();
        assert_eq!(
            context.naming_strategy().field_name("traderId").as_deref(),
            Some("trader_id")
        );
    }
}
