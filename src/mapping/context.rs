//! Mapping context: the per-type cache of entity metadata.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use super::entity::{Entity, EntityMetadata};
use super::error::{MappingError, MappingResult};
use super::naming::{default_strategy, FieldNamingStrategy};

type CachedEntity = Arc<dyn Any + Send + Sync>;

/// Caches [`EntityMetadata`] per type under one naming strategy.
///
/// Thread-safe: the first lookup of a type builds its metadata under the
/// cache's write lock, so concurrent first lookups observe one instance.
pub struct MappingContext {
    entities: RwLock<HashMap<TypeId, CachedEntity>>,
    naming_strategy: RwLock<Arc<dyn FieldNamingStrategy>>,
}

impl MappingContext {
    /// Create a context using the default (field name) strategy.
    pub fn new() -> Self {
        Self::with_naming_strategy(default_strategy())
    }

    /// Create a context using the given naming strategy.
    pub fn with_naming_strategy(strategy: Arc<dyn FieldNamingStrategy>) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            naming_strategy: RwLock::new(strategy),
        }
    }

    /// The naming strategy new metadata is resolved with.
    pub fn naming_strategy(&self) -> Arc<dyn FieldNamingStrategy> {
        self.naming_strategy.read().clone()
    }

    /// Replace the naming strategy; `None` restores the default.
    ///
    /// Cached metadata was resolved with the previous strategy, so the cache
    /// is cleared and entities are rebuilt on their next lookup. Metadata
    /// handed out earlier keeps its old column names.
    pub fn set_naming_strategy(&self, strategy: Option<Arc<dyn FieldNamingStrategy>>) {
        // Lock order: entities before naming_strategy, matching `entity`.
        let mut entities = self.entities.write();
        let mut current = self.naming_strategy.write();
        *current = strategy.unwrap_or_else(default_strategy);
        let dropped = entities.len();
        entities.clear();
        debug!(
            "event=naming_strategy_changed module=mapping status=ok invalidated={}",
            dropped
        );
    }

    /// Metadata for `T`, built on first use and cached afterwards.
    ///
    /// # Errors
    /// Returns the [`MappingError`] raised while building the metadata. A
    /// failed build is not cached.
    pub fn entity<T: Entity>(&self) -> MappingResult<Arc<EntityMetadata<T>>> {
        let key = TypeId::of::<T>();

        if let Some(cached) = self.entities.read().get(&key) {
            return downcast::<T>(cached.clone());
        }

        let mut entities = self.entities.write();
        if let Some(cached) = entities.get(&key) {
            return downcast::<T>(cached.clone());
        }

        let strategy = self.naming_strategy.read().clone();
        let entity = Arc::new(EntityMetadata::<T>::build(strategy)?);
        entities.insert(key, entity.clone() as CachedEntity);
        debug!(
            "event=entity_registered module=mapping status=ok entity={} table={} properties={}",
            entity.type_name(),
            entity.table_name(),
            entity.properties().len()
        );
        Ok(entity)
    }

    /// Number of cached entity types.
    pub fn cached_entities(&self) -> usize {
        self.entities.read().len()
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MappingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Each lock is released before the next is taken.
        let strategy = self.naming_strategy();
        let cached = self.cached_entities();
        f.debug_struct("MappingContext")
            .field("naming_strategy", &strategy)
            .field("cached_entities", &cached)
            .finish()
    }
}

fn downcast<T: Entity>(cached: CachedEntity) -> MappingResult<Arc<EntityMetadata<T>>> {
    cached
        .downcast::<EntityMetadata<T>>()
        .map_err(|_| MappingError::unsupported(type_name::<T>()))
}
