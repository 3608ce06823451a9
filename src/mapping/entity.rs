//! Entity metadata: how a type maps to a table.
//!
//! Types opt in by implementing [`Entity`] and declaring their properties on
//! an [`EntityBuilder`]. The builder produces an accessor table once; reads
//! and writes go through that table afterwards.
//!
//! ```
//! use spanner_data::mapping::{Entity, EntityBuilder};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Trade {
//!     id: String,
//!     symbol: String,
//!     trader_id: String,
//!     price: f64,
//! }
//!
//! impl Entity for Trade {
//!     fn describe(entity: &mut EntityBuilder<Self>) {
//!         entity
//!             .table("Trade")
//!             .id("id", |t| &t.id, |t| &mut t.id)
//!             .property("symbol", |t| &t.symbol, |t| &mut t.symbol)
//!             .property("traderId", |t| &t.trader_id, |t| &mut t.trader_id)
//!             .property("price", |t| &t.price, |t| &mut t.price);
//!     }
//! }
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use super::error::{MappingError, MappingResult};
use super::naming::FieldNamingStrategy;
use super::property::{PersistentProperty, PropertyDescriptor};

/// A type that can be persisted to and materialized from a table.
///
/// `Default` supplies the freshly allocated instance that row values are
/// written into.
pub trait Entity: Default + Send + Sync + 'static {
    /// Declare the table and properties of this type.
    fn describe(entity: &mut EntityBuilder<Self>);
}

/// Collects the table override and property declarations of an entity.
pub struct EntityBuilder<T> {
    table: Option<String>,
    properties: Vec<PropertyDescriptor<T>>,
    error: Option<MappingError>,
}

impl<T: Entity> EntityBuilder<T> {
    fn new() -> Self {
        Self {
            table: None,
            properties: Vec::new(),
            error: None,
        }
    }

    /// Override the derived table name. An empty name keeps the derived one.
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.table = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Declare the identifier property.
    pub fn id<V, G, S>(&mut self, name: &str, get: G, get_mut: S) -> &mut Self
    where
        V: Any,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        self.push(PropertyDescriptor::new(name, true, get, get_mut))
    }

    /// Declare a non-identifier property.
    pub fn property<V, G, S>(&mut self, name: &str, get: G, get_mut: S) -> &mut Self
    where
        V: Any,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        self.push(PropertyDescriptor::new(name, false, get, get_mut))
    }

    /// Override the column name of the most recently declared property.
    pub fn column(&mut self, column: impl Into<String>) -> &mut Self {
        let column = column.into();
        match self.properties.last_mut() {
            Some(last) => last.column = Some(column),
            None => {
                self.error.get_or_insert(MappingError::UnknownProperty {
                    entity: simple_type_name::<T>().to_string(),
                    property: column,
                });
            }
        }
        self
    }

    fn push(&mut self, descriptor: MappingResult<PropertyDescriptor<T>>) -> &mut Self {
        match descriptor {
            Ok(descriptor) => self.properties.push(descriptor),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }
}

/// Resolved metadata of one entity type.
pub struct EntityMetadata<T> {
    type_name: &'static str,
    table_name: String,
    properties: Vec<PersistentProperty<T>>,
    naming_strategy: Arc<dyn FieldNamingStrategy>,
}

impl<T: Entity> EntityMetadata<T> {
    /// Build the metadata of `T` under a naming strategy.
    ///
    /// # Errors
    /// Returns [`MappingError::UnsupportedType`] when a declared field type is
    /// not a supported column type. Unresolvable column names and identifier
    /// problems are not reported here; they surface when first used.
    pub fn build(strategy: Arc<dyn FieldNamingStrategy>) -> MappingResult<Self> {
        let mut builder = EntityBuilder::<T>::new();
        T::describe(&mut builder);
        if let Some(err) = builder.error {
            return Err(err);
        }

        let type_name = simple_type_name::<T>();
        let table_name = builder
            .table
            .unwrap_or_else(|| uncapitalize(type_name));
        let properties = builder
            .properties
            .into_iter()
            .map(|descriptor| PersistentProperty::resolve(type_name, descriptor, strategy.as_ref()))
            .collect();

        Ok(Self {
            type_name,
            table_name,
            properties,
            naming_strategy: strategy,
        })
    }

    /// Allocate an empty instance to populate.
    pub fn instantiate(&self) -> T {
        T::default()
    }
}

impl<T> EntityMetadata<T> {
    /// Unqualified name of the mapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table the entity maps to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PersistentProperty<T>] {
        &self.properties
    }

    /// Naming strategy the column names were resolved with.
    pub fn naming_strategy(&self) -> &Arc<dyn FieldNamingStrategy> {
        &self.naming_strategy
    }

    /// Look up a property by field name.
    pub fn property(&self, name: &str) -> Option<&PersistentProperty<T>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Look up a property by field name, failing if it is not mapped.
    pub fn require_property(&self, name: &str) -> MappingResult<&PersistentProperty<T>> {
        self.property(name)
            .ok_or_else(|| MappingError::UnknownProperty {
                entity: self.type_name.to_string(),
                property: name.to_string(),
            })
    }

    /// Look up a property by its resolved column name.
    pub fn property_by_column_name(&self, column: &str) -> Option<&PersistentProperty<T>> {
        self.properties.iter().find(|p| p.has_column(column))
    }

    /// The identifier property.
    ///
    /// # Errors
    /// Returns [`MappingError::NoIdentifier`] when no property is marked as
    /// identifier and [`MappingError::AmbiguousIdentifier`] when several are.
    pub fn id_property(&self) -> MappingResult<&PersistentProperty<T>> {
        let mut ids = self.properties.iter().filter(|p| p.is_id());
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(MappingError::NoIdentifier {
                entity: self.type_name.to_string(),
            }),
            (Some(_), Some(_)) => Err(MappingError::AmbiguousIdentifier {
                entity: self.type_name.to_string(),
                properties: self
                    .properties
                    .iter()
                    .filter(|p| p.is_id())
                    .map(|p| p.name().to_string())
                    .collect(),
            }),
        }
    }

    /// Column names of all properties in declaration order.
    ///
    /// # Errors
    /// Returns the first [`MappingError::UnresolvedColumnName`] encountered.
    pub fn columns(&self) -> MappingResult<Vec<&str>> {
        self.properties.iter().map(|p| p.column_name()).collect()
    }
}

impl<T> fmt::Debug for EntityMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// `my_app::model::Trade<X>` -> `Trade`.
pub(crate) fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// `TraderId` -> `traderId`.
pub(crate) fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
