//! Mapping error types.

use thiserror::Error;

use super::types::ColumnType;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Errors raised while resolving or applying entity metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// The property has no usable column name (empty override or empty
    /// naming-strategy output).
    #[error("unresolved column name for property '{property}' of entity {entity}")]
    UnresolvedColumnName { entity: String, property: String },

    /// The declared field type is not one of the supported column kinds.
    #[error("unsupported type: {type_name}")]
    UnsupportedType { type_name: String },

    /// No property of the entity is marked as identifier.
    #[error("no identifier property declared on entity {entity}")]
    NoIdentifier { entity: String },

    /// More than one property of the entity is marked as identifier.
    #[error("no identifier: entity {entity} declares multiple identifier properties ({})", .properties.join(", "))]
    AmbiguousIdentifier {
        entity: String,
        properties: Vec<String>,
    },

    /// A row value does not fit the declared kind of the target field.
    #[error("type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: &'static str,
    },

    /// A property name that the entity does not map.
    #[error("entity {entity} has no property named '{property}'")]
    UnknownProperty { entity: String, property: String },
}

impl MappingError {
    /// Create an unsupported type error for a type name.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Check if this error reports a missing or ambiguous identifier.
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self,
            MappingError::NoIdentifier { .. } | MappingError::AmbiguousIdentifier { .. }
        )
    }
}
