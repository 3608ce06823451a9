//! Repositories: CRUD over one entity type and query method dispatch.

mod factory;
pub mod query;
mod simple;

pub use factory::RepositoryFactory;
pub use query::{QueryLookupStrategy, QueryMethod, QueryResult, RepositoryQuery, ReturnKind};
pub use simple::SimpleRepository;
