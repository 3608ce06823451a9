//! CRUD repository over one entity type.

use std::fmt;
use std::marker::PhantomData;

use crate::client::{Key, KeySet, ReadOptions};
use crate::core::{DataResult, SpannerTemplate};
use crate::mapping::{Entity, Value};

/// Collection-style access to the entities of type `T`, identified by `ID`.
pub struct SimpleRepository<T, ID> {
    template: SpannerTemplate,
    _types: PhantomData<fn() -> (T, ID)>,
}

impl<T, ID> SimpleRepository<T, ID>
where
    T: Entity,
    ID: Into<Value>,
{
    pub fn new(template: SpannerTemplate) -> Self {
        Self {
            template,
            _types: PhantomData,
        }
    }

    pub fn template(&self) -> &SpannerTemplate {
        &self.template
    }

    /// Insert or overwrite `entity` and hand it back.
    pub fn save(&self, entity: T) -> DataResult<T> {
        self.template.upsert(&entity)?;
        Ok(entity)
    }

    /// Save every entity in one write.
    pub fn save_all<I>(&self, entities: I) -> DataResult<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let entities: Vec<T> = entities.into_iter().collect();
        self.template.upsert_all(&entities)?;
        Ok(entities)
    }

    /// `None` when no row has the id.
    pub fn find_by_id(&self, id: ID) -> DataResult<Option<T>> {
        match self.template.find_by_key::<T>(&Key::of(id)) {
            Ok(entity) => Ok(Some(entity)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn exists_by_id(&self, id: ID) -> DataResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    pub fn find_all(&self) -> DataResult<Vec<T>> {
        self.template.find_all::<T>(&ReadOptions::default())
    }

    /// Entities whose id is in `ids`; missing ids are skipped.
    pub fn find_all_by_id<I>(&self, ids: I) -> DataResult<Vec<T>>
    where
        I: IntoIterator<Item = ID>,
    {
        let key_set = Self::key_set(ids);
        self.template.find_by_keys::<T>(&key_set, &ReadOptions::default())
    }

    pub fn count(&self) -> DataResult<i64> {
        self.template.count::<T>()
    }

    pub fn delete_by_id(&self, id: ID) -> DataResult<()> {
        self.template.delete_by_key::<T>(Key::of(id))
    }

    pub fn delete(&self, entity: &T) -> DataResult<()> {
        self.template.delete_entity(entity)
    }

    /// Delete the given entities in one mutation. An empty iterator deletes
    /// over an empty key set.
    pub fn delete_all_entities<'a, I>(&self, entities: I) -> DataResult<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.template.delete_entities(entities)
    }

    /// Delete every row of the entity's table.
    pub fn delete_all(&self) -> DataResult<()> {
        self.template.delete_key_set::<T>(KeySet::all())
    }

    fn key_set<I>(ids: I) -> KeySet
    where
        I: IntoIterator<Item = ID>,
    {
        ids.into_iter().map(Key::of).collect()
    }
}

impl<T, ID> Clone for SimpleRepository<T, ID> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            _types: PhantomData,
        }
    }
}

impl<T, ID> fmt::Debug for SimpleRepository<T, ID> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleRepository")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}
