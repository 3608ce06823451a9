//! Resolution of query methods to executable queries.

use std::collections::BTreeMap;

use log::debug;

use super::derived::DerivedQuery;
use super::evaluation::{referenced_parameters, without_expressions};
use super::method::QueryMethod;
use super::sql::SqlQuery;
use super::RepositoryQuery;
use crate::client::sql::validate_query;
use crate::config::{DataConfig, QueryLookupKind};
use crate::core::{DataError, DataResult, SpannerTemplate};
use crate::mapping::Entity;

/// Named SQL registered by query name (`Entity.method`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedQueries {
    queries: BTreeMap<String, String>,
}

impl NamedQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, sql: impl Into<String>) {
        self.queries.insert(name.into(), sql.into());
    }

    pub fn has_query(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn get_query(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl From<BTreeMap<String, String>> for NamedQueries {
    fn from(queries: BTreeMap<String, String>) -> Self {
        Self { queries }
    }
}

/// Chooses between named SQL and method-name derivation.
#[derive(Debug, Clone, Default)]
pub struct QueryLookupStrategy {
    kind: QueryLookupKind,
    named_queries: NamedQueries,
}

impl QueryLookupStrategy {
    pub fn new(kind: QueryLookupKind, named_queries: NamedQueries) -> Self {
        Self {
            kind,
            named_queries,
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(config.query_lookup, config.named_queries.clone().into())
    }

    pub fn kind(&self) -> QueryLookupKind {
        self.kind
    }

    pub fn named_queries(&self) -> &NamedQueries {
        &self.named_queries
    }

    /// Resolve `method` of a repository over `T`.
    ///
    /// # Errors
    /// [`DataError::InvalidArgument`] when a declared query is required but
    /// missing, or when registered SQL is not a single `SELECT` or refers to
    /// a parameter the method does not declare. Derived queries fail as
    /// [`DerivedQuery::new`] does.
    pub fn resolve_query<T: Entity>(
        &self,
        method: QueryMethod,
        template: &SpannerTemplate,
    ) -> DataResult<Box<dyn RepositoryQuery<T>>> {
        let declared = match self.kind {
            QueryLookupKind::Create => None,
            QueryLookupKind::UseDeclaredQuery | QueryLookupKind::CreateIfNotFound => {
                self.named_queries.get_query(&method.named_query_name())
            }
        };

        match (declared, self.kind) {
            (Some(sql), _) => {
                check_named_sql(&method, sql)?;
                debug!(
                    "event=resolve_query module=repository status=ok method={} strategy=named",
                    method.named_query_name()
                );
                Ok(Box::new(SqlQuery::<T>::new(method, sql, template.clone())))
            }
            (None, QueryLookupKind::UseDeclaredQuery) => Err(DataError::invalid_argument(format!(
                "no named query registered for {}",
                method.named_query_name()
            ))),
            (None, _) => {
                let query = DerivedQuery::<T>::new(method, template.clone())?;
                debug!(
                    "event=resolve_query module=repository status=ok method={} strategy=derived",
                    query.query_method().named_query_name()
                );
                Ok(Box::new(query))
            }
        }
    }
}

fn check_named_sql(method: &QueryMethod, sql: &str) -> DataResult<()> {
    validate_query(&without_expressions(sql)).map_err(|err| {
        DataError::invalid_argument(format!(
            "named query {} is not a valid query: {}",
            method.named_query_name(),
            err.message
        ))
    })?;

    if let Some(unknown) = referenced_parameters(sql)
        .into_iter()
        .find(|name| !method.parameters().iter().any(|p| p == name))
    {
        return Err(DataError::invalid_argument(format!(
            "named query {} refers to undeclared parameter @{}",
            method.named_query_name(),
            unknown
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::InMemoryClient;
    use crate::mapping::{EntityBuilder, MappingContext, Value};
    use crate::repository::query::ReturnKind;

    #[derive(Debug, Default)]
    struct Trader {
        id: String,
        name: String,
    }

    impl Entity for Trader {
        fn describe(entity: &mut EntityBuilder<Self>) {
            entity
                .id("id", |t| &t.id, |t| &mut t.id)
                .property("name", |t| &t.name, |t| &mut t.name);
        }
    }

    fn template() -> SpannerTemplate {
        let client = InMemoryClient::new().with_table("trader", &["id"]);
        let template = SpannerTemplate::new(Arc::new(client), Arc::new(MappingContext::new()));
        for (id, name) in [("t1", "Ann"), ("t2", "Bob")] {
            template
                .insert(&Trader { id: id.into(), name: name.into() })
                .unwrap();
        }
        template
    }

    fn find_by_name() -> QueryMethod {
        QueryMethod::new::<Trader>("findByName", &["name"], ReturnKind::Collection)
    }

    fn named(sql: &str) -> NamedQueries {
        let mut queries = NamedQueries::new();
        queries.add("Trader.findByName", sql);
        queries
    }

    #[test]
    fn test_create_if_not_found_prefers_named() {
        let strategy = QueryLookupStrategy::new(
            QueryLookupKind::CreateIfNotFound,
            named("SELECT * FROM trader WHERE name = @name"),
        );
        let template = template();
        let named = strategy.resolve_query::<Trader>(find_by_name(), &template).unwrap();
        let found = named.execute(&[Value::from("Ann")]).unwrap().into_list().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "t1");

        let derived = strategy
            .resolve_query::<Trader>(
                QueryMethod::new::<Trader>("findByIdOrName", &["id", "name"], ReturnKind::Collection),
                &template,
            )
            .unwrap();
        let all = derived
            .execute(&[Value::from("t1"), Value::from("Ann")])
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_use_declared_query_requires_sql() {
        let strategy = QueryLookupStrategy::new(QueryLookupKind::UseDeclaredQuery, NamedQueries::new());
        let err = strategy
            .resolve_query::<Trader>(find_by_name(), &template())
            .err()
            .unwrap();
        assert!(matches!(err, DataError::InvalidArgument(_)));
    }

    #[test]
    fn test_create_ignores_named_sql() {
        let strategy = QueryLookupStrategy::new(QueryLookupKind::Create, named("not sql at all"));
        assert!(strategy.resolve_query::<Trader>(find_by_name(), &template()).is_ok());
    }

    #[test]
    fn test_named_sql_validated() {
        let template = template();
        for sql in [
            "DELETE FROM trader WHERE name = @name",
            "SELEC * FROM trader",
            "SELECT * FROM trader WHERE name = @other",
        ] {
            let strategy = QueryLookupStrategy::new(QueryLookupKind::CreateIfNotFound, named(sql));
            let err = strategy
                .resolve_query::<Trader>(find_by_name(), &template)
                .err()
                .unwrap();
            assert!(matches!(err, DataError::InvalidArgument(_)), "{}", sql);
        }

        let strategy = QueryLookupStrategy::new(
            QueryLookupKind::CreateIfNotFound,
            named("SELECT * FROM trader WHERE name = #{[0]}"),
        );
        assert!(strategy.resolve_query::<Trader>(find_by_name(), &template).is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = DataConfig::new()
            .query_lookup(QueryLookupKind::Create)
            .named_query("Trader.findByName", "SELECT * FROM trader");
        let strategy = QueryLookupStrategy::from_config(&config);
        assert_eq!(strategy.kind(), QueryLookupKind::Create);
        assert!(strategy.named_queries().has_query("Trader.findByName"));
    }
}
