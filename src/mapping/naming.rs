//! Field naming strategies.
//!
//! A strategy turns a property's field name into the column name expected in
//! the table when no explicit column override is declared. Returning `None`
//! or an empty string leaves the property without a usable column.

use std::fmt;
use std::sync::Arc;

/// Derives a column name from a field name.
pub trait FieldNamingStrategy: Send + Sync + fmt::Debug {
    /// Column name for the given field name.
    fn field_name(&self, property: &str) -> Option<String>;
}

/// Uses the field name unchanged. This is the default strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyNameStrategy;

impl FieldNamingStrategy for PropertyNameStrategy {
    fn field_name(&self, property: &str) -> Option<String> {
        Some(property.to_string())
    }
}

/// Converts camel-case field names to snake case (`traderId` -> `trader_id`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnakeCaseStrategy;

impl FieldNamingStrategy for SnakeCaseStrategy {
    fn field_name(&self, property: &str) -> Option<String> {
        let mut out = String::with_capacity(property.len() + 4);
        let mut prev_lower = false;
        for c in property.chars() {
            if c.is_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
                prev_lower = false;
            } else {
                out.push(c);
                prev_lower = c.is_lowercase() || c.is_ascii_digit();
            }
        }
        Some(out)
    }
}

/// Adapts a closure into a naming strategy.
pub struct FnStrategy<F>(pub F);

impl<F> FieldNamingStrategy for FnStrategy<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn field_name(&self, property: &str) -> Option<String> {
        (self.0)(property)
    }
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnStrategy")
    }
}

/// The strategy installed when none is configured.
pub fn default_strategy() -> Arc<dyn FieldNamingStrategy> {
    Arc::new(PropertyNameStrategy)
}
