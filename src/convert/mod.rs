//! Value mapping between rows and entities.

mod object_mapper;
mod result_set;

pub use object_mapper::StructObjectMapper;
pub use result_set::ResultSetMapper;
