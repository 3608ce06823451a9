//! Entity and property metadata.
//!
//! This module discovers how a type maps to a table: the table name, the
//! ordered properties with their column names, and the identifier property.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MappingContext                         │
//! │      (TypeId -> EntityMetadata cache, naming strategy)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │  EntityMetadata   │──── table name, id lookup
//!                    └───────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │PersistentProperty │──── column name, accessors
//!                    └───────────────────┘
//!                              │
//!                              ▼
//!                    ┌───────────────────┐
//!                    │ FieldType / Value │──── supported column kinds
//!                    └───────────────────┘
//! ```

mod context;
mod entity;
mod error;
mod naming;
mod property;
mod types;

pub use context::MappingContext;
pub use entity::{Entity, EntityBuilder, EntityMetadata};
pub use error::{MappingError, MappingResult};
pub use naming::{
    default_strategy, FieldNamingStrategy, FnStrategy, PropertyNameStrategy, SnakeCaseStrategy,
};
pub use property::{Association, PersistentProperty};
pub use types::{ColumnType, FieldType, Value};

pub(crate) use entity::{simple_type_name, uncapitalize};
