//! Spanner Data - entity mapping, templates and repositories over a
//! Spanner-style row store.
//!
//! Application types describe their persistent properties once; the crate
//! turns them into typed mutations, materializes rows back into objects and
//! runs reads, writes and transactions through an abstract database client.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use spanner_data::client::{InMemoryClient, Key};
//! use spanner_data::core::SpannerTemplate;
//! use spanner_data::mapping::{Entity, EntityBuilder, MappingContext};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Trader {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Entity for Trader {
//!     fn describe(entity: &mut EntityBuilder<Self>) {
//!         entity
//!             .id("id", |t| &t.id, |t| &mut t.id)
//!             .property("name", |t| &t.name, |t| &mut t.name);
//!     }
//! }
//!
//! let client = InMemoryClient::new().with_table("trader", &["id"]);
//! let template = SpannerTemplate::new(Arc::new(client), Arc::new(MappingContext::new()));
//!
//! let ann = Trader { id: "t1".into(), name: "Ann".into() };
//! template.insert(&ann).unwrap();
//! assert_eq!(template.find_by_key::<Trader>(&Key::of("t1")).unwrap(), ann);
//! ```

pub mod client;
pub mod config;
pub mod convert;
pub mod core;
pub mod logging;
pub mod mapping;
pub mod repository;

pub use crate::config::DataConfig;
pub use crate::core::{DataError, DataResult, SpannerTemplate, TransactionContext};
pub use crate::mapping::{Entity, EntityBuilder, MappingContext, Value};
pub use crate::repository::{RepositoryFactory, SimpleRepository};
