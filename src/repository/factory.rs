//! Repository construction.

use std::sync::Arc;

use log::debug;

use super::query::{QueryLookupStrategy, QueryMethod, RepositoryQuery};
use super::simple::SimpleRepository;
use crate::client::DatabaseClient;
use crate::config::DataConfig;
use crate::core::{DataResult, SpannerTemplate};
use crate::mapping::{Entity, Value};

/// Builds repositories and resolves their query methods.
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    template: SpannerTemplate,
    lookup: QueryLookupStrategy,
}

impl RepositoryFactory {
    pub fn new(template: SpannerTemplate, lookup: QueryLookupStrategy) -> Self {
        Self { template, lookup }
    }

    /// Template, mapping context and lookup strategy from one configuration.
    pub fn from_config(client: Arc<dyn DatabaseClient>, config: &DataConfig) -> Self {
        Self::new(
            SpannerTemplate::with_config(client, config),
            QueryLookupStrategy::from_config(config),
        )
    }

    pub fn template(&self) -> &SpannerTemplate {
        &self.template
    }

    pub fn lookup_strategy(&self) -> &QueryLookupStrategy {
        &self.lookup
    }

    /// A CRUD repository for `T`.
    ///
    /// # Errors
    /// Fails when `T` cannot be mapped or has no single identifier.
    pub fn repository<T, ID>(&self) -> DataResult<SimpleRepository<T, ID>>
    where
        T: Entity,
        ID: Into<Value>,
    {
        let entity = self.template.mapping_context().entity::<T>()?;
        let id = entity.id_property()?;
        debug!(
            "event=repository_create module=repository status=ok entity={} table={} id={}",
            entity.type_name(),
            entity.table_name(),
            id.name()
        );
        Ok(SimpleRepository::new(self.template.clone()))
    }

    /// Resolve a query method of a repository over `T`.
    pub fn query<T: Entity>(&self, method: QueryMethod) -> DataResult<Box<dyn RepositoryQuery<T>>> {
        self.lookup.resolve_query::<T>(method, &self.template)
    }
}
