//! In-memory database client.
//!
//! Keeps tables as ordered row lists keyed by their declared key columns.
//! Writes apply atomically per call; transactions read a snapshot taken when
//! they start and apply their buffered mutations in one step on success.
//!
//! Queries support the subset parsed by [`SimpleSelect`]. Any statement can
//! also be given a canned result with [`InMemoryClient::stub_query`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::error::{ClientError, ClientResult};
use super::mutation::{Mutation, Op};
use super::sql::{Operand, Projection, SimpleSelect};
use super::types::{Key, KeySet, QueryOptions, ReadOptions, ResultSet, Row, Statement};
use super::{DatabaseClient, ReadContext, TransactionHandle};
use crate::core::DataResult;
use crate::mapping::Value;

/// A database client holding all data in process memory.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryClient {
    inner: Arc<ClientInner>,
}

#[derive(Default)]
struct ClientInner {
    state: RwLock<State>,
    stubs: RwLock<HashMap<String, ResultSet>>,
    log: Mutex<Vec<Mutation>>,
    commits: AtomicU64,
    aborts: AtomicU64,
}

#[derive(Debug, Clone, Default)]
struct State {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone)]
struct Table {
    key_columns: Vec<String>,
    rows: Vec<(Key, Row)>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table with its primary key columns.
    pub fn create_table(&self, name: &str, key_columns: &[&str]) {
        self.inner.state.write().tables.insert(
            name.to_string(),
            Table {
                key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        );
    }

    /// Builder form of [`InMemoryClient::create_table`].
    pub fn with_table(self, name: &str, key_columns: &[&str]) -> Self {
        self.create_table(name, key_columns);
        self
    }

    /// Return `result` for any statement whose SQL equals `sql`.
    pub fn stub_query(&self, sql: &str, result: ResultSet) {
        self.inner
            .stubs
            .write()
            .insert(sql.trim().to_string(), result);
    }

    /// All rows of a table in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner
            .state
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.iter().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default()
    }

    /// Every mutation applied so far, in application order.
    pub fn applied_mutations(&self) -> Vec<Mutation> {
        self.inner.log.lock().clone()
    }

    pub fn commit_count(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> u64 {
        self.inner.aborts.load(Ordering::SeqCst)
    }

    fn apply(&self, mutations: Vec<Mutation>) -> ClientResult<()> {
        let mut state = self.inner.state.write();
        let mut next = state.clone();
        for mutation in &mutations {
            next.apply(mutation)?;
        }
        *state = next;
        self.inner.log.lock().extend(mutations);
        Ok(())
    }

    fn stub(&self, statement: &Statement) -> Option<ResultSet> {
        self.inner.stubs.read().get(statement.sql().trim()).cloned()
    }
}

impl std::fmt::Debug for InMemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryClient")
            .field("tables", &self.inner.state.read().tables.len())
            .field("commits", &self.commit_count())
            .field("aborts", &self.abort_count())
            .finish()
    }
}

impl DatabaseClient for InMemoryClient {
    fn single_use(&self) -> Box<dyn ReadContext + '_> {
        Box::new(SingleUse { client: self })
    }

    fn write(&self, mutations: Vec<Mutation>) -> ClientResult<()> {
        self.apply(mutations)
    }

    fn run_in_transaction(
        &self,
        work: &mut dyn FnMut(&dyn TransactionHandle) -> DataResult<()>,
    ) -> DataResult<()> {
        let transaction = MemoryTransaction {
            client: self,
            snapshot: self.inner.state.read().clone(),
            buffer: Mutex::new(Vec::new()),
        };

        let outcome = work(&transaction).and_then(|()| {
            let buffered = std::mem::take(&mut *transaction.buffer.lock());
            self.apply(buffered).map_err(Into::into)
        });
        match outcome {
            Ok(()) => {
                self.inner.commits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => {
                self.inner.aborts.fetch_add(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }
}

/// Reads against the latest committed state.
struct SingleUse<'a> {
    client: &'a InMemoryClient,
}

impl ReadContext for SingleUse<'_> {
    fn execute_query(&self, statement: &Statement, _options: &QueryOptions) -> ClientResult<ResultSet> {
        if let Some(result) = self.client.stub(statement) {
            return Ok(result);
        }
        self.client.inner.state.read().query(statement)
    }

    fn read(
        &self,
        table: &str,
        key_set: &KeySet,
        columns: &[&str],
        options: &ReadOptions,
    ) -> ClientResult<ResultSet> {
        self.client.inner.state.read().read(table, key_set, columns, options)
    }

    fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> ClientResult<Option<Row>> {
        self.client.inner.state.read().read_row(table, key, columns)
    }
}

/// A read-write transaction over a snapshot with buffered writes.
struct MemoryTransaction<'a> {
    client: &'a InMemoryClient,
    snapshot: State,
    buffer: Mutex<Vec<Mutation>>,
}

impl ReadContext for MemoryTransaction<'_> {
    fn execute_query(&self, statement: &Statement, _options: &QueryOptions) -> ClientResult<ResultSet> {
        if let Some(result) = self.client.stub(statement) {
            return Ok(result);
        }
        self.snapshot.query(statement)
    }

    fn read(
        &self,
        table: &str,
        key_set: &KeySet,
        columns: &[&str],
        options: &ReadOptions,
    ) -> ClientResult<ResultSet> {
        self.snapshot.read(table, key_set, columns, options)
    }

    fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> ClientResult<Option<Row>> {
        self.snapshot.read_row(table, key, columns)
    }
}

impl TransactionHandle for MemoryTransaction<'_> {
    fn buffer(&self, mutations: Vec<Mutation>) -> ClientResult<()> {
        self.buffer.lock().extend(mutations);
        Ok(())
    }
}

impl State {
    fn table(&self, name: &str) -> ClientResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| ClientError::not_found(format!("table not found: {}", name)))
    }

    fn table_mut(&mut self, name: &str) -> ClientResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| ClientError::not_found(format!("table not found: {}", name)))
    }

    fn apply(&mut self, mutation: &Mutation) -> ClientResult<()> {
        let table = self.table_mut(mutation.table())?;

        if mutation.op() == Op::Delete {
            let key_set = mutation.key_set().cloned().unwrap_or_default();
            table.rows.retain(|(key, _)| !key_set.contains(key));
            return Ok(());
        }

        let row = mutation.as_row();
        let key = table.key_of(&row)?;
        let position = table.rows.iter().position(|(k, _)| *k == key);

        match (mutation.op(), position) {
            (Op::Insert, Some(_)) => Err(ClientError::already_exists(format!(
                "row {} already exists in {}",
                key,
                mutation.table()
            ))),
            (Op::Update, None) => Err(ClientError::not_found(format!(
                "row {} not found in {}",
                key,
                mutation.table()
            ))),
            (Op::Update | Op::InsertOrUpdate, Some(i)) => {
                let existing = &mut table.rows[i].1;
                for (column, value) in mutation.values() {
                    existing.set(column.clone(), value.clone());
                }
                Ok(())
            }
            (Op::Replace, Some(i)) => {
                table.rows[i].1 = row;
                Ok(())
            }
            (_, None) => {
                table.rows.push((key, row));
                Ok(())
            }
            (Op::Delete, Some(_)) => Ok(()),
        }
    }

    fn read(
        &self,
        table: &str,
        key_set: &KeySet,
        columns: &[&str],
        options: &ReadOptions,
    ) -> ClientResult<ResultSet> {
        let table = self.table(table)?;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows = table
            .rows
            .iter()
            .filter(|(key, _)| key_set.contains(key))
            .take(limit)
            .map(|(_, row)| project(row, columns))
            .collect();
        Ok(ResultSet::from_rows(rows))
    }

    fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> ClientResult<Option<Row>> {
        let table = self.table(table)?;
        Ok(table
            .rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, row)| project(row, columns)))
    }

    fn query(&self, statement: &Statement) -> ClientResult<ResultSet> {
        let select = SimpleSelect::parse(statement.sql())?;
        let table = self.table(&select.table)?;

        let filter = select
            .filter
            .iter()
            .map(|(column, operand)| {
                let value = match operand {
                    Operand::Literal(value) => value.clone(),
                    Operand::Param(name) => statement.param(name).cloned().ok_or_else(|| {
                        ClientError::invalid_argument(format!("no value bound for @{}", name))
                    })?,
                };
                Ok((column.as_str(), value))
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let matching = table.rows.iter().map(|(_, row)| row).filter(|row| {
            filter
                .iter()
                .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
        });
        let limit = select.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        let rows = match &select.projection {
            Projection::CountAll => {
                let count = matching.take(limit).count() as i64;
                vec![Row::new().with("count", count)]
            }
            Projection::All => matching.take(limit).cloned().collect(),
            Projection::Columns(columns) => {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                matching.take(limit).map(|row| row.project(&columns)).collect()
            }
        };
        Ok(ResultSet::from_rows(rows))
    }
}

impl Table {
    fn key_of(&self, row: &Row) -> ClientResult<Key> {
        self.key_columns
            .iter()
            .map(|column| {
                row.get(column).cloned().ok_or_else(|| {
                    ClientError::invalid_argument(format!("key column {} is not bound", column))
                })
            })
            .collect::<ClientResult<Vec<_>>>()
            .map(Key::from_parts)
    }
}

fn project(row: &Row, columns: &[&str]) -> Row {
    if columns.is_empty() {
        row.clone()
    } else {
        row.project(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::ErrorCode;
    use crate::core::DataError;

    fn client() -> InMemoryClient {
        InMemoryClient::new().with_table("trader", &["id"])
    }

    fn insert(id: &str, name: &str) -> Mutation {
        let mut builder = Mutation::new_insert_builder("trader");
        builder.set("id", id).set("name", name);
        builder.build()
    }

    #[test]
    fn test_insert_and_read_row() {
        let client = client();
        client.write(vec![insert("1", "Ray")]).unwrap();

        let row = client
            .single_use()
            .read_row("trader", &Key::of("1"), &["name"])
            .unwrap()
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("Ray")));
        assert_eq!(row.len(), 1);

        let missing = client.single_use().read_row("trader", &Key::of("2"), &[]).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_insert_existing_fails_atomically() {
        let client = client();
        client.write(vec![insert("1", "Ray")]).unwrap();

        let err = client
            .write(vec![insert("2", "Ann"), insert("1", "Dup")])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(client.rows("trader").len(), 1);
    }

    #[test]
    fn test_update_merges_and_replace_overwrites() {
        let client = client();
        let mut builder = Mutation::new_insert_builder("trader");
        builder.set("id", "1").set("name", "Ray").set("rating", 5_i64);
        client.write(vec![builder.build()]).unwrap();

        let mut update = Mutation::new_update_builder("trader");
        update.set("id", "1").set("name", "Raymond");
        client.write(vec![update.build()]).unwrap();
        let row = &client.rows("trader")[0];
        assert_eq!(row.get("name"), Some(&Value::from("Raymond")));
        assert_eq!(row.get("rating"), Some(&Value::Int64(5)));

        let mut replace = Mutation::new_replace_builder("trader");
        replace.set("id", "1").set("name", "R");
        client.write(vec![replace.build()]).unwrap();
        assert_eq!(client.rows("trader")[0].get("rating"), None);

        let mut missing = Mutation::new_update_builder("trader");
        missing.set("id", "9");
        let err = client.write(vec![missing.build()]).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_delete_by_key_set() {
        let client = client();
        client
            .write(vec![insert("1", "a"), insert("2", "b"), insert("3", "c")])
            .unwrap();

        client
            .write(vec![Mutation::delete("trader", KeySet::singleton(Key::of("2")))])
            .unwrap();
        assert_eq!(client.rows("trader").len(), 2);

        client.write(vec![Mutation::delete("trader", KeySet::new())]).unwrap();
        assert_eq!(client.rows("trader").len(), 2);

        client.write(vec![Mutation::delete("trader", KeySet::all())]).unwrap();
        assert!(client.rows("trader").is_empty());
    }

    #[test]
    fn test_query_with_parameters() {
        let client = client();
        client
            .write(vec![insert("1", "a"), insert("2", "b"), insert("3", "b")])
            .unwrap();

        let statement = Statement::of("SELECT * FROM trader WHERE name = @name").bind("name", "b");
        let rows = client
            .single_use()
            .execute_query(&statement, &QueryOptions::default())
            .unwrap();
        assert_eq!(rows.len(), 2);

        let count = client
            .single_use()
            .execute_query(&Statement::of("SELECT COUNT(*) FROM trader"), &QueryOptions::default())
            .unwrap();
        assert_eq!(count.first().unwrap().get_i64(0), Some(3));

        let unbound = client
            .single_use()
            .execute_query(&Statement::of("SELECT * FROM trader WHERE name = @name"), &QueryOptions::default())
            .unwrap_err();
        assert_eq!(unbound.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_stubbed_query() {
        let client = client();
        client.stub_query(
            "select count(*) from trade",
            ResultSet::from_rows(vec![Row::new().with("", 5_i64)]),
        );
        let result = client
            .single_use()
            .execute_query(&Statement::of("select count(*) from trade"), &QueryOptions::default())
            .unwrap();
        assert_eq!(result.first().unwrap().get_i64(0), Some(5));
    }

    #[test]
    fn test_transaction_commits_and_aborts() {
        let client = client();

        client
            .run_in_transaction(&mut |tx| {
                tx.buffer(vec![insert("1", "a")])?;
                // Buffered writes are not visible to the transaction's own reads.
                assert!(tx.read_row("trader", &Key::of("1"), &[])?.is_none());
                Ok(())
            })
            .unwrap();
        assert_eq!(client.rows("trader").len(), 1);
        assert_eq!(client.commit_count(), 1);

        let err = client
            .run_in_transaction(&mut |tx| {
                tx.buffer(vec![insert("2", "b")])?;
                Err(DataError::InvalidArgument("stop".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidArgument(_)));
        assert_eq!(client.rows("trader").len(), 1);
        assert_eq!(client.abort_count(), 1);
    }
}
