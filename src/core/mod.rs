//! Template layer: mutations, reads and transactions over entities.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SpannerTemplate                        │
//! │   (single-use reads, blind writes, transaction(unit_of_work))│
//! └─────────────────────────────────────────────────────────────┘
//!          │                     │                      │
//!          ▼                     ▼                      ▼
//! ┌─────────────────┐  ┌──────────────────┐  ┌────────────────────┐
//! │ MutationFactory │  │   ReadTemplate   │  │ TransactionContext │
//! │ entity -> write │  │ rows -> entities │  │ reads + buffering  │
//! └─────────────────┘  └──────────────────┘  └────────────────────┘
//!          │                     │
//!          └──────────┬──────────┘
//!                     ▼
//!            ┌─────────────────┐
//!            │ MappingContext  │
//!            └─────────────────┘
//! ```

mod error;
mod mutation_factory;
mod read_template;
mod template;
mod transaction;

pub use error::{DataError, DataResult};
pub use mutation_factory::MutationFactory;
pub use read_template::ReadTemplate;
pub use template::SpannerTemplate;
pub use transaction::TransactionContext;
