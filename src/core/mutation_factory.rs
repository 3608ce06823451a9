//! Builds typed write operations from entities.

use std::sync::Arc;

use crate::client::{Key, KeySet, Mutation, Op, WriteBuilder};
use crate::convert::StructObjectMapper;
use crate::core::error::{DataError, DataResult};
use crate::mapping::{Entity, MappingContext};

/// Converts entities into mutations using the shared mapping context.
///
/// Stateless apart from the context, so one factory serves every caller.
#[derive(Debug, Clone)]
pub struct MutationFactory {
    context: Arc<MappingContext>,
    object_mapper: StructObjectMapper,
}

impl MutationFactory {
    pub fn new(context: Arc<MappingContext>) -> Self {
        Self {
            object_mapper: StructObjectMapper::new(context.clone()),
            context,
        }
    }

    /// Insert binding every mapped property.
    pub fn insert<T: Entity>(&self, object: &T) -> DataResult<Mutation> {
        self.create_mutation(Op::Insert, object, None)
    }

    /// Insert-or-update binding every mapped property.
    pub fn upsert<T: Entity>(&self, object: &T) -> DataResult<Mutation> {
        self.create_mutation(Op::InsertOrUpdate, object, None)
    }

    /// Full-row replace binding every mapped property.
    pub fn replace<T: Entity>(&self, object: &T) -> DataResult<Mutation> {
        self.create_mutation(Op::Replace, object, None)
    }

    /// Update binding the identifier and only the named properties.
    ///
    /// An empty `properties` slice writes the identifier column alone.
    ///
    /// # Errors
    /// Returns [`MappingError::UnknownProperty`](crate::mapping::MappingError)
    /// when a name is not a mapped property of `T`.
    pub fn update<T: Entity>(&self, object: &T, properties: &[&str]) -> DataResult<Mutation> {
        let entity = self.context.entity::<T>()?;
        entity.id_property()?;
        for name in properties {
            entity.require_property(name)?;
        }
        self.create_mutation(Op::Update, object, Some(properties))
    }

    /// Delete the row of one entity, keyed on its identifier.
    pub fn delete_entity<T: Entity>(&self, object: &T) -> DataResult<Mutation> {
        let entity = self.context.entity::<T>()?;
        let key = Key::of(entity.id_property()?.get(object)?);
        Ok(Mutation::delete(entity.table_name(), KeySet::singleton(key)))
    }

    /// One delete spanning the identifiers of every given entity.
    ///
    /// No entities yields a delete over an empty key set.
    pub fn delete_entities<'a, T, I>(&self, objects: I) -> DataResult<Mutation>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        let entity = self.context.entity::<T>()?;
        let id = entity.id_property()?;
        let mut key_set = KeySet::new();
        for object in objects {
            key_set.add_key(Key::of(id.get(object)?));
        }
        Ok(Mutation::delete(entity.table_name(), key_set))
    }

    /// Delete the rows of `T` whose keys are in `key_set`.
    pub fn delete_keys<T: Entity>(&self, key_set: KeySet) -> DataResult<Mutation> {
        let entity = self.context.entity::<T>()?;
        Ok(Mutation::delete(entity.table_name(), key_set))
    }

    /// Write builder for a value mutation kind.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidArgument`] for [`Op::Delete`], which has
    /// no value builder.
    pub fn write_builder(&self, op: Op, table: &str) -> DataResult<WriteBuilder> {
        match op {
            Op::Insert => Ok(Mutation::new_insert_builder(table)),
            Op::InsertOrUpdate => Ok(Mutation::new_insert_or_update_builder(table)),
            Op::Update => Ok(Mutation::new_update_builder(table)),
            Op::Replace => Ok(Mutation::new_replace_builder(table)),
            Op::Delete => Err(DataError::invalid_argument(format!(
                "unknown mutation operation: {}",
                op
            ))),
        }
    }

    fn create_mutation<T: Entity>(
        &self,
        op: Op,
        object: &T,
        include: Option<&[&str]>,
    ) -> DataResult<Mutation> {
        let entity = self.context.entity::<T>()?;
        let mut builder = self.write_builder(op, entity.table_name())?;
        self.object_mapper.write(object, &mut builder, |property| {
            property.is_id()
                || include.map_or(true, |names| names.iter().any(|n| *n == property.name()))
        })?;
        Ok(builder.build())
    }
}
