//! Row to object conversion and its inverse.

use std::sync::Arc;

use crate::client::{Row, WriteBuilder};
use crate::mapping::{Entity, MappingContext, MappingResult, PersistentProperty, Value};

/// Converts rows into entities and entities into column bindings.
#[derive(Debug, Clone)]
pub struct StructObjectMapper {
    context: Arc<MappingContext>,
}

impl StructObjectMapper {
    pub fn new(context: Arc<MappingContext>) -> Self {
        Self { context }
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        &self.context
    }

    /// Materialize a fresh `T` from a row.
    ///
    /// Properties whose column is absent from the row keep their default
    /// value. A present column whose value does not fit the field fails.
    pub fn read<T: Entity>(&self, row: &Row) -> MappingResult<T> {
        let entity = self.context.entity::<T>()?;
        let mut object = entity.instantiate();
        for property in entity.properties() {
            if let Some(value) = row.get(property.column_name()?) {
                property.set(&mut object, value.clone())?;
            }
        }
        Ok(object)
    }

    /// Column bindings of every property that passes `filter`, in
    /// declaration order.
    pub fn bindings<T, F>(&self, object: &T, filter: F) -> MappingResult<Vec<(String, Value)>>
    where
        T: Entity,
        F: Fn(&PersistentProperty<T>) -> bool,
    {
        let entity = self.context.entity::<T>()?;
        entity
            .properties()
            .iter()
            .filter(|property| filter(property))
            .map(|property| Ok((property.column_name()?.to_string(), property.get(object)?)))
            .collect()
    }

    /// Write the bindings of every property that passes `filter` into a
    /// mutation builder.
    pub fn write<T, F>(&self, object: &T, sink: &mut WriteBuilder, filter: F) -> MappingResult<()>
    where
        T: Entity,
        F: Fn(&PersistentProperty<T>) -> bool,
    {
        for (column, value) in self.bindings(object, filter)? {
            sink.set(column, value);
        }
        Ok(())
    }
}
