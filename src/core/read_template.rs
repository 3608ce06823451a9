//! Reads composed against any read context.
//!
//! The same template serves single-use snapshots and open transactions: the
//! caller chooses the [`ReadContext`], the template resolves metadata and
//! materializes rows.

use std::sync::Arc;

use log::debug;

use crate::client::{Key, KeySet, QueryOptions, ReadContext, ReadOptions, Statement};
use crate::convert::{ResultSetMapper, StructObjectMapper};
use crate::core::error::{DataError, DataResult};
use crate::mapping::{Entity, MappingContext};

/// Materializing reads over a [`ReadContext`].
#[derive(Debug, Clone)]
pub struct ReadTemplate {
    context: Arc<MappingContext>,
    object_mapper: StructObjectMapper,
    result_mapper: ResultSetMapper,
    default_read_limit: Option<u64>,
}

impl ReadTemplate {
    pub fn new(context: Arc<MappingContext>) -> Self {
        let object_mapper = StructObjectMapper::new(context.clone());
        Self {
            result_mapper: ResultSetMapper::new(object_mapper.clone()),
            object_mapper,
            context,
            default_read_limit: None,
        }
    }

    /// Limit applied to key-set reads issued without an explicit limit.
    pub fn with_default_read_limit(mut self, limit: Option<u64>) -> Self {
        self.default_read_limit = limit;
        self
    }

    pub fn mapping_context(&self) -> &Arc<MappingContext> {
        &self.context
    }

    pub fn object_mapper(&self) -> &StructObjectMapper {
        &self.object_mapper
    }

    /// Read one entity by primary key.
    ///
    /// # Errors
    /// Returns [`DataError::NotFound`] when no row has the key.
    pub fn find_by_key<T, R>(&self, reader: &R, key: &Key) -> DataResult<T>
    where
        T: Entity,
        R: ReadContext + ?Sized,
    {
        let entity = self.context.entity::<T>()?;
        let columns = entity.columns()?;
        let row = reader.read_row(entity.table_name(), key, &columns)?;
        debug!(
            "event=read_row module=core status=ok table={} found={}",
            entity.table_name(),
            row.is_some()
        );

        match row {
            Some(row) => Ok(self.object_mapper.read(&row)?),
            None => Err(DataError::NotFound {
                table: entity.table_name().to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Read every entity whose key is in `key_set`.
    ///
    /// An empty key set returns an empty list without touching the client.
    pub fn find_by_keys<T, R>(
        &self,
        reader: &R,
        key_set: &KeySet,
        options: &ReadOptions,
    ) -> DataResult<Vec<T>>
    where
        T: Entity,
        R: ReadContext + ?Sized,
    {
        let entity = self.context.entity::<T>()?;
        if key_set.is_empty() {
            return Ok(Vec::new());
        }

        let columns = entity.columns()?;
        let options = self.effective_options(options);
        let rows = reader.read(entity.table_name(), key_set, &columns, &options)?;
        debug!(
            "event=read module=core status=ok table={} all={} rows={}",
            entity.table_name(),
            key_set.is_all(),
            rows.len()
        );
        Ok(self.result_mapper.map_to_list(&rows)?)
    }

    /// Read every entity of the table.
    pub fn find_all<T, R>(&self, reader: &R, options: &ReadOptions) -> DataResult<Vec<T>>
    where
        T: Entity,
        R: ReadContext + ?Sized,
    {
        self.find_by_keys(reader, &KeySet::all(), options)
    }

    /// Execute a statement and materialize every returned row.
    pub fn find_by_statement<T, R>(
        &self,
        reader: &R,
        statement: &Statement,
        options: &QueryOptions,
    ) -> DataResult<Vec<T>>
    where
        T: Entity,
        R: ReadContext + ?Sized,
    {
        self.context.entity::<T>()?;
        let rows = reader.execute_query(statement, options)?;
        debug!(
            "event=execute_query module=core status=ok params={} rows={}",
            statement.params().len(),
            rows.len()
        );
        Ok(self.result_mapper.map_to_list(&rows)?)
    }

    fn effective_options(&self, options: &ReadOptions) -> ReadOptions {
        let mut options = options.clone();
        if options.limit.is_none() {
            options.limit = self.default_read_limit;
        }
        options
    }
}
