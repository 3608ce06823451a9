//! Named SQL query methods.

use std::marker::PhantomData;

use log::debug;

use super::evaluation::EvaluationContext;
use super::method::{QueryMethod, ReturnKind};
use super::{QueryResult, RepositoryQuery};
use crate::client::sql::is_count_query;
use crate::client::QueryOptions;
use crate::core::{DataResult, SpannerTemplate};
use crate::mapping::{Entity, Value};

/// Executes registered SQL with the method arguments bound.
pub struct SqlQuery<T> {
    method: QueryMethod,
    sql: String,
    template: SpannerTemplate,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqlQuery<T> {
    pub fn new(method: QueryMethod, sql: impl Into<String>, template: SpannerTemplate) -> Self {
        Self {
            method,
            sql: sql.into(),
            template,
            _entity: PhantomData,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Count and exists methods read the scalar of a `COUNT` query and
    /// otherwise count the returned rows.
    fn execute_scalar(&self, parameters: &[Value]) -> DataResult<i64> {
        let context = EvaluationContext::new(&self.method, parameters)?;
        let statement = context.bind(&self.sql)?;
        let rows = self
            .template
            .client()
            .single_use()
            .execute_query(&statement, &QueryOptions::default())?;

        if is_count_query(statement.sql()) {
            if let Some(count) = rows.first().and_then(|row| row.get_i64(0)) {
                return Ok(count);
            }
        }
        Ok(rows.len() as i64)
    }
}

impl<T: Entity> RepositoryQuery<T> for SqlQuery<T> {
    fn execute(&self, parameters: &[Value]) -> DataResult<QueryResult<T>> {
        debug!(
            "event=sql_query module=repository status=start method={} params={}",
            self.method.named_query_name(),
            parameters.len()
        );
        match self.method.return_kind() {
            ReturnKind::Count => Ok(QueryResult::Count(self.execute_scalar(parameters)?)),
            ReturnKind::Exists => Ok(QueryResult::Exists(self.execute_scalar(parameters)? > 0)),
            kind => {
                let context = EvaluationContext::new(&self.method, parameters)?;
                let statement = context.bind(&self.sql)?;
                let entities = self
                    .template
                    .find_by_statement::<T>(&statement, &QueryOptions::default())?;
                Ok(QueryResult::from_entities(entities, kind))
            }
        }
    }

    fn query_method(&self) -> &QueryMethod {
        &self.method
    }
}
