//! Unit-of-work context handed to transactional callbacks.

use std::sync::Arc;

use log::debug;

use crate::client::{Key, KeySet, Mutation, QueryOptions, ReadOptions, Statement, TransactionHandle};
use crate::core::error::DataResult;
use crate::core::mutation_factory::MutationFactory;
use crate::core::read_template::ReadTemplate;
use crate::mapping::{Entity, MappingContext};

/// Reads and buffered writes inside one transaction.
///
/// Shares the mapping context, mutation factory and read template of the
/// [`SpannerTemplate`](crate::core::SpannerTemplate) that opened it, so
/// mapping behaves exactly as outside a transaction. Writes are buffered on
/// the transaction and applied when it commits; reads see the transaction's
/// snapshot.
pub struct TransactionContext<'a> {
    handle: &'a dyn TransactionHandle,
    read_template: &'a ReadTemplate,
    mapping_context: &'a Arc<MappingContext>,
    mutation_factory: &'a MutationFactory,
}

impl<'a> TransactionContext<'a> {
    pub(crate) fn new(
        handle: &'a dyn TransactionHandle,
        read_template: &'a ReadTemplate,
        mapping_context: &'a Arc<MappingContext>,
        mutation_factory: &'a MutationFactory,
    ) -> Self {
        Self {
            handle,
            read_template,
            mapping_context,
            mutation_factory,
        }
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        self.mapping_context
    }

    pub fn find_by_key<T: Entity>(&self, key: &Key) -> DataResult<T> {
        self.read_template.find_by_key(self.handle, key)
    }

    pub fn find_by_keys<T: Entity>(&self, key_set: &KeySet, options: &ReadOptions) -> DataResult<Vec<T>> {
        self.read_template.find_by_keys(self.handle, key_set, options)
    }

    pub fn find_all<T: Entity>(&self, options: &ReadOptions) -> DataResult<Vec<T>> {
        self.read_template.find_all(self.handle, options)
    }

    pub fn find_by_statement<T: Entity>(
        &self,
        statement: &Statement,
        options: &QueryOptions,
    ) -> DataResult<Vec<T>> {
        self.read_template.find_by_statement(self.handle, statement, options)
    }

    pub fn insert<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.buffer(self.mutation_factory.insert(object)?)
    }

    /// Update the identifier and the named properties only.
    pub fn update<T: Entity>(&self, object: &T, properties: &[&str]) -> DataResult<()> {
        self.buffer(self.mutation_factory.update(object, properties)?)
    }

    pub fn upsert<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.buffer(self.mutation_factory.upsert(object)?)
    }

    pub fn replace<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.buffer(self.mutation_factory.replace(object)?)
    }

    pub fn delete_entity<T: Entity>(&self, object: &T) -> DataResult<()> {
        self.buffer(self.mutation_factory.delete_entity(object)?)
    }

    pub fn delete_by_key<T: Entity>(&self, key: Key) -> DataResult<()> {
        self.buffer(self.mutation_factory.delete_keys::<T>(KeySet::singleton(key))?)
    }

    pub fn delete_entities<'o, T, I>(&self, objects: I) -> DataResult<()>
    where
        T: Entity,
        I: IntoIterator<Item = &'o T>,
    {
        self.buffer(self.mutation_factory.delete_entities(objects)?)
    }

    fn buffer(&self, mutation: Mutation) -> DataResult<()> {
        debug!(
            "event=buffer_mutation module=core status=ok table={} op={}",
            mutation.table(),
            mutation.op()
        );
        self.handle.buffer(vec![mutation])?;
        Ok(())
    }
}
