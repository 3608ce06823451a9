//! Row-by-row materialization of query results into entities.

use super::object_mapper::StructObjectMapper;
use crate::client::ResultSet;
use crate::mapping::{Entity, MappingResult};

/// Materializes every row of a result set.
#[derive(Debug, Clone)]
pub struct ResultSetMapper {
    object_mapper: StructObjectMapper,
}

impl ResultSetMapper {
    pub fn new(object_mapper: StructObjectMapper) -> Self {
        Self { object_mapper }
    }

    /// Map each row to a fresh `T`, appending to `target`.
    pub fn map_into<T: Entity>(&self, result_set: &ResultSet, target: &mut Vec<T>) -> MappingResult<()> {
        for row in result_set.iter() {
            target.push(self.object_mapper.read(row)?);
        }
        Ok(())
    }

    /// Map each row to a fresh `T`. The list is owned by the caller.
    pub fn map_to_list<T: Entity>(&self, result_set: &ResultSet) -> MappingResult<Vec<T>> {
        let mut list = Vec::with_capacity(result_set.len());
        self.map_into(result_set, &mut list)?;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Row;
    use crate::mapping::{EntityBuilder, MappingContext};
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Quote {
        symbol: String,
        bid: f64,
    }

    impl Entity for Quote {
        fn describe(entity: &mut EntityBuilder<Self>) {
            entity
                .id("symbol", |q| &q.symbol, |q| &mut q.symbol)
                .property("bid", |q| &q.bid, |q| &mut q.bid);
        }
    }

    #[test]
    fn test_map_to_list_preserves_row_order() {
        let mapper = ResultSetMapper::new(StructObjectMapper::new(Arc::new(MappingContext::new())));
        let rows = ResultSet::from_rows(vec![
            Row::new().with("symbol", "B").with("bid", 2.0),
            Row::new().with("symbol", "A").with("bid", 1.0),
        ]);

        let quotes: Vec<Quote> = mapper.map_to_list(&rows).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol, "B");
        assert_eq!(quotes[1].bid, 1.0);

        let empty: Vec<Quote> = mapper.map_to_list(&ResultSet::new()).unwrap();
        assert!(empty.is_empty());
    }
}
