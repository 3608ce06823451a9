//! The template: entity-level reads and writes against a database client.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::client::{
    DatabaseClient, Key, KeySet, Mutation, QueryOptions, ReadOptions, Statement,
};
use crate::config::DataConfig;
use crate::core::error::{DataError, DataResult};
use crate::core::mutation_factory::MutationFactory;
use crate::core::read_template::ReadTemplate;
use crate::core::transaction::TransactionContext;
use crate::mapping::{Entity, MappingContext};

/// Entity-level data access over a [`DatabaseClient`].
///
/// Reads outside [`SpannerTemplate::transaction`] use a fresh single-use
/// snapshot per call. Thread-safe: can be shared across threads via Clone
/// (uses Arc internally).
#[derive(Clone)]
pub struct SpannerTemplate {
    inner: Arc<TemplateInner>,
}

struct TemplateInner {
    client: Arc<dyn DatabaseClient>,
    mapping_context: Arc<MappingContext>,
    mutation_factory: MutationFactory,
    read_template: ReadTemplate,
}

impl SpannerTemplate {
    /// Create a template sharing `mapping_context`.
    pub fn new(client: Arc<dyn DatabaseClient>, mapping_context: Arc<MappingContext>) -> Self {
        Self::build(client, mapping_context, None)
    }

    /// Create a template with its own mapping context built from `config`.
    pub fn with_config(client: Arc<dyn DatabaseClient>, config: &DataConfig) -> Self {
        Self::build(
            client,
            Arc::new(config.mapping_context()),
            config.default_read_limit,
        )
    }

    fn build(
        client: Arc<dyn DatabaseClient>,
        mapping_context: Arc<MappingContext>,
        default_read_limit: Option<u64>,
    ) -> Self {
        Self {
            inner: Arc::new(TemplateInner {
                client,
                mutation_factory: MutationFactory::new(mapping_context.clone()),
                read_template: ReadTemplate::new(mapping_context.clone())
                    .with_default_read_limit(default_read_limit),
                mapping_context,
            }),
        }
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        &self.inner.mapping_context
    }

    pub fn client(&self) -> &Arc<dyn DatabaseClient> {
        &self.inner.client
    }

    pub fn mutation_factory(&self) -> &MutationFactory {
        &self.inner.mutation_factory
    }

    pub fn read_template(&self) -> &ReadTemplate {
        &self.inner.read_template
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read one entity by primary key; [`DataError::NotFound`] when absent.
    pub fn find_by_key<T: Entity>(&self, key: &Key) -> DataResult<T> {
        let reader = self.inner.client.single_use();
        self.inner.read_template.find_by_key(reader.as_ref(), key)
    }

    pub fn find_by_keys<T: Entity>(&self, key_set: &KeySet, options: &ReadOptions) -> DataResult<Vec<T>> {
        let reader = self.inner.client.single_use();
        self.inner
            .read_template
            .find_by_keys(reader.as_ref(), key_set, options)
    }

    pub fn find_all<T: Entity>(&self, options: &ReadOptions) -> DataResult<Vec<T>> {
        let reader = self.inner.client.single_use();
        self.inner.read_template.find_all(reader.as_ref(), options)
    }

    pub fn find_by_statement<T: Entity>(
        &self,
        statement: &Statement,
        options: &QueryOptions,
    ) -> DataResult<Vec<T>> {
        let reader = self.inner.client.single_use();
        self.inner
            .read_template
            .find_by_statement(reader.as_ref(), statement, options)
    }

    /// Number of rows in the table of `T`.
    pub fn count<T: Entity>(&self) -> DataResult<i64> {
        let entity = self.inner.mapping_context.entity::<T>()?;
        let statement = Statement::of(format!("select count(*) from {}", entity.table_name()));
        let rows = self
            .inner
            .client
            .single_use()
            .execute_query(&statement, &QueryOptions::default())?;

        let count = rows
            .first()
            .and_then(|row| row.get_i64(0))
            .ok_or_else(|| {
                DataError::invalid_argument(format!(
                    "count query on {} returned no integer",
                    entity.table_name()
                ))
            })?;
        debug!(
            "event=count module=core status=ok table={} count={}",
            entity.table_name(),
            count
        );
        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn insert<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.write(self.inner.mutation_factory.insert(object)?)
    }

    /// Update the identifier and the named properties only; an empty list
    /// writes no other column.
    pub fn update<T: Entity>(&self, object: &T, properties: &[&str]) -> DataResult<()> {
        self.write(self.inner.mutation_factory.update(object, properties)?)
    }

    pub fn upsert<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.write(self.inner.mutation_factory.upsert(object)?)
    }

    pub fn replace<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.write(self.inner.mutation_factory.replace(object)?)
    }

    pub fn delete_entity<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.write(self.inner.mutation_factory.delete_entity(object)?)
    }

    pub fn delete_by_key<T: Entity>(&self, key: Key) -> DataResult<()> {
        self.delete_key_set::<T>(KeySet::singleton(key))
    }

    pub fn delete_entities<'a, T, I>(&self, objects: I) -> DataResult<()>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        self.write(self.inner.mutation_factory.delete_entities(objects)?)
    }

    pub fn delete_key_set<T: Entity>(&self, key_set: KeySet) -> DataResult<()> {
        self.write(self.inner.mutation_factory.delete_keys::<T>(key_set)?)
    }

    /// Upsert every object in a single atomic write.
    pub fn upsert_all<'a, T, I>(&self, objects: I) -> DataResult<()>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        let mutations = objects
            .into_iter()
            .map(|object| self.inner.mutation_factory.upsert(object))
            .collect::<DataResult<Vec<_>>>()?;
        self.write_all(mutations)
    }

    fn write(&self, mutation: Mutation) -> DataResult<()> {
        self.write_all(vec![mutation])
    }

    fn write_all(&self, mutations: Vec<Mutation>) -> DataResult<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let table = mutations[0].table().to_string();
        let count = mutations.len();
        self.inner.client.write(mutations)?;
        debug!(
            "event=write module=core status=ok table={} mutations={}",
            table, count
        );
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `unit_of_work` inside a read-write transaction.
    ///
    /// The transaction commits when the unit of work returns `Ok`. Any error
    /// aborts it and is returned unchanged; this layer never retries, though
    /// the client may invoke the unit of work again if it does.
    pub fn transaction<R, F>(&self, mut unit_of_work: F) -> DataResult<R>
    where
        F: FnMut(&TransactionContext<'_>) -> DataResult<R>,
    {
        let inner = &self.inner;
        let mut result = None;
        let outcome = inner.client.run_in_transaction(&mut |handle| {
            let context = TransactionContext::new(
                handle,
                &inner.read_template,
                &inner.mapping_context,
                &inner.mutation_factory,
            );
            result = Some(unit_of_work(&context)?);
            Ok(())
        });

        match outcome {
            Ok(()) => {
                info!("event=transaction_commit module=core status=ok");
                result.ok_or_else(|| {
                    DataError::invalid_argument("transaction committed without running its unit of work")
                })
            }
            Err(err) => {
                warn!("event=transaction_abort module=core status=error error={}", err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SpannerTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerTemplate")
            .field("mapping_context", &self.inner.mapping_context)
            .finish()
    }
}
