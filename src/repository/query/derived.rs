//! Query methods derived from the method name.

use std::marker::PhantomData;

use log::warn;

use super::method::{QueryMethod, ReturnKind};
use super::part_tree::{PartTree, Subject};
use super::{QueryResult, RepositoryQuery};
use crate::client::ReadOptions;
use crate::core::{DataError, DataResult, SpannerTemplate};
use crate::mapping::{Entity, Value};

/// A query whose predicate comes from the method name.
///
/// The predicate is parsed and validated, but execution reads every row of
/// the entity's table: predicate evaluation is not implemented. Delete
/// subjects are executed as reads too and never remove rows.
pub struct DerivedQuery<T> {
    method: QueryMethod,
    tree: PartTree,
    template: SpannerTemplate,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DerivedQuery<T> {
    /// Parse the method name of `method` against `T`.
    ///
    /// # Errors
    /// Fails when the name is not a derived query, names an unmapped
    /// property, or needs more arguments than the method declares.
    pub fn new(method: QueryMethod, template: SpannerTemplate) -> DataResult<Self> {
        let tree = PartTree::parse::<T>(method.name(), template.mapping_context())?;
        if tree.parameter_count() > method.parameters().len() {
            return Err(DataError::invalid_argument(format!(
                "{} needs {} arguments but declares {}",
                method.name(),
                tree.parameter_count(),
                method.parameters().len()
            )));
        }
        Ok(Self {
            method,
            tree,
            template,
            _entity: PhantomData,
        })
    }

    pub fn tree(&self) -> &PartTree {
        &self.tree
    }
}

impl<T: Entity> RepositoryQuery<T> for DerivedQuery<T> {
    fn execute(&self, parameters: &[Value]) -> DataResult<QueryResult<T>> {
        if parameters.len() != self.method.parameters().len() {
            return Err(DataError::invalid_argument(format!(
                "{} expects {} arguments, got {}",
                self.method.name(),
                self.method.parameters().len(),
                parameters.len()
            )));
        }

        warn!(
            "event=derived_query module=repository status=fallback method={} parts={} action=read_all",
            self.method.named_query_name(),
            self.tree.parts().count()
        );
        let entities = self.template.find_all::<T>(&ReadOptions::default())?;

        let kind = match self.tree.subject() {
            Subject::Count => ReturnKind::Count,
            Subject::Exists => ReturnKind::Exists,
            Subject::Find | Subject::Delete => self.method.return_kind(),
        };
        Ok(QueryResult::from_entities(entities, kind))
    }

    fn query_method(&self) -> &QueryMethod {
        &self.method
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::InMemoryClient;
    use crate::mapping::{EntityBuilder, MappingContext};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Trader {
        id: String,
        name: String,
    }

    impl Entity for Trader {
        fn describe(entity: &mut EntityBuilder<Self>) {
            entity
                .id("id", |t| &t.id, |t| &mut t.id)
                .property("name", |t| &t.name, |t| &mut t.name);
        }
    }

    fn seeded() -> (InMemoryClient, SpannerTemplate) {
        let client = InMemoryClient::new().with_table("trader", &["id"]);
        let template =
            SpannerTemplate::new(Arc::new(client.clone()), Arc::new(MappingContext::new()));
        for (id, name) in [("t1", "Ann"), ("t2", "Bob")] {
            template
                .insert(&Trader { id: id.into(), name: name.into() })
                .unwrap();
        }
        (client, template)
    }

    #[test]
    fn test_falls_back_to_read_all() {
        let (_, template) = seeded();
        let method = QueryMethod::new::<Trader>("findByName", &["name"], ReturnKind::Collection);
        let query = DerivedQuery::<Trader>::new(method, template).unwrap();

        let all = query.execute(&[Value::from("Ann")]).unwrap().into_list().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_count_and_exists_subjects() {
        let (_, template) = seeded();
        let count = DerivedQuery::<Trader>::new(
            QueryMethod::new::<Trader>("countByName", &["name"], ReturnKind::Collection),
            template.clone(),
        )
        .unwrap();
        assert_eq!(count.execute(&[Value::from("Ann")]).unwrap().count(), Some(2));

        let exists = DerivedQuery::<Trader>::new(
            QueryMethod::new::<Trader>("existsById", &["id"], ReturnKind::Exists),
            template,
        )
        .unwrap();
        assert_eq!(exists.execute(&[Value::from("t9")]).unwrap().exists(), Some(true));
    }

    #[test]
    fn test_delete_subject_is_read_only() {
        let (client, template) = seeded();
        let query = DerivedQuery::<Trader>::new(
            QueryMethod::new::<Trader>("deleteByName", &["name"], ReturnKind::Collection),
            template,
        )
        .unwrap();
        query.execute(&[Value::from("Ann")]).unwrap();
        assert_eq!(client.rows("trader").len(), 2);
    }

    #[test]
    fn test_argument_checks() {
        let (_, template) = seeded();
        let err = DerivedQuery::<Trader>::new(
            QueryMethod::new::<Trader>("findByNameAndId", &["name"], ReturnKind::Collection),
            template.clone(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DataError::InvalidArgument(_)));

        let query = DerivedQuery::<Trader>::new(
            QueryMethod::new::<Trader>("findByName", &["name"], ReturnKind::Collection),
            template,
        )
        .unwrap();
        assert!(query.execute(&[]).is_err());
    }
}
