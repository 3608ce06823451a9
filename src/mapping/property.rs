//! Property metadata: one mapped field bound to one column.

use std::any::Any;
use std::fmt;

use super::error::{MappingError, MappingResult};
use super::naming::FieldNamingStrategy;
use super::types::{FieldType, Value};

pub(crate) type Getter<T> = Box<dyn Fn(&T) -> MappingResult<Value> + Send + Sync>;
pub(crate) type Setter<T> = Box<dyn Fn(&mut T, Value, &str) -> MappingResult<()> + Send + Sync>;

/// Unresolved description of a property, as declared by an entity.
pub(crate) struct PropertyDescriptor<T> {
    pub(crate) name: String,
    pub(crate) column: Option<String>,
    pub(crate) id: bool,
    pub(crate) field_type: FieldType,
    pub(crate) getter: Getter<T>,
    pub(crate) setter: Setter<T>,
}

impl<T: 'static> PropertyDescriptor<T> {
    /// Build the accessor pair for a field of type `V`.
    pub(crate) fn new<V, G, S>(name: &str, id: bool, get: G, get_mut: S) -> MappingResult<Self>
    where
        V: Any,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let field_type = FieldType::of::<V>()?;
        Ok(Self {
            name: name.to_string(),
            column: None,
            id,
            field_type,
            getter: Box::new(move |entity: &T| field_type.read(get(entity))),
            setter: Box::new(move |entity: &mut T, value: Value, column: &str| {
                field_type.assign(get_mut(entity), value, column)
            }),
        })
    }
}

/// A mapped field of an entity with its resolved column name.
pub struct PersistentProperty<T> {
    entity: &'static str,
    name: String,
    field_type: FieldType,
    column_override: Option<String>,
    column_name: Option<String>,
    id: bool,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T> PersistentProperty<T> {
    /// Resolve a descriptor's column name against a naming strategy.
    ///
    /// Resolution never fails here: an empty override or an empty strategy
    /// result is recorded and reported by [`PersistentProperty::column_name`].
    pub(crate) fn resolve(
        entity: &'static str,
        descriptor: PropertyDescriptor<T>,
        strategy: &dyn FieldNamingStrategy,
    ) -> Self {
        let column_name = match descriptor.column.as_deref() {
            Some("") => None,
            Some(column) => Some(column.to_string()),
            None => strategy
                .field_name(&descriptor.name)
                .filter(|name| !name.is_empty()),
        };

        Self {
            entity,
            name: descriptor.name,
            field_type: descriptor.field_type,
            column_override: descriptor.column,
            column_name,
            id: descriptor.id,
            getter: descriptor.getter,
            setter: descriptor.setter,
        }
    }

    /// Field name of the property.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the field.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Explicit column override, if one was declared.
    pub fn column_override(&self) -> Option<&str> {
        self.column_override.as_deref()
    }

    /// Column name the property binds to.
    ///
    /// # Errors
    /// Returns [`MappingError::UnresolvedColumnName`] when the override was
    /// empty or the naming strategy produced no name.
    pub fn column_name(&self) -> MappingResult<&str> {
        self.column_name
            .as_deref()
            .ok_or_else(|| MappingError::UnresolvedColumnName {
                entity: self.entity.to_string(),
                property: self.name.clone(),
            })
    }

    /// Whether this property is the entity identifier.
    pub fn is_id(&self) -> bool {
        self.id
    }

    /// Read the property from an entity as a column value.
    pub fn get(&self, entity: &T) -> MappingResult<Value> {
        (self.getter)(entity)
    }

    /// Assign a column value into the property of an entity.
    pub fn set(&self, entity: &mut T, value: Value) -> MappingResult<()> {
        let column = self.column_name.as_deref().unwrap_or(&self.name);
        (self.setter)(entity, value, column)
    }

    /// Association descriptor for this property.
    ///
    /// Properties are plain columns, so the property is its own inverse and
    /// there is no obverse side.
    pub fn create_association(&self) -> Association<'_, T> {
        Association {
            inverse: self,
            obverse: None,
        }
    }

    pub(crate) fn has_column(&self, column: &str) -> bool {
        self.column_name.as_deref() == Some(column)
    }
}

impl<T> fmt::Debug for PersistentProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentProperty")
            .field("name", &self.name)
            .field("column_name", &self.column_name)
            .field("field_type", &self.field_type)
            .field("id", &self.id)
            .finish()
    }
}

/// The two sides of a property association.
pub struct Association<'a, T> {
    inverse: &'a PersistentProperty<T>,
    obverse: Option<&'a PersistentProperty<T>>,
}

impl<'a, T> Association<'a, T> {
    pub fn inverse(&self) -> &'a PersistentProperty<T> {
        self.inverse
    }

    pub fn obverse(&self) -> Option<&'a PersistentProperty<T>> {
        self.obverse
    }
}
