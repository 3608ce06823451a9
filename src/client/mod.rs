//! Database client contract.
//!
//! The mapping layer talks to the database only through these traits. A
//! client offers single-use snapshot reads, blind writes and read-write
//! transactions; commit, abort and retries are entirely its business.
//!
//! ```text
//!   DatabaseClient ── single_use() ──▶ ReadContext
//!        │                              ▲
//!        └── run_in_transaction(fn) ──▶ TransactionHandle (reads + buffer)
//! ```

pub mod error;
pub mod memory;
pub mod mutation;
pub mod sql;
pub mod types;

pub use error::{ClientError, ClientResult, ErrorCode};
pub use memory::InMemoryClient;
pub use mutation::{Mutation, Op, WriteBuilder};
pub use types::{Key, KeySet, QueryOptions, ReadOptions, ResultSet, Row, Statement};

// Transactions carry the template-level error: the unit of work runs
// mapping code, and its failure must reach the caller unchanged, so the
// client cannot narrow it to `ClientError`. Client failures convert into
// it through `DataError::Client`.
use crate::core::DataResult;

/// Read operations available on a snapshot or inside a transaction.
pub trait ReadContext {
    /// Execute a parameterized statement.
    fn execute_query(&self, statement: &Statement, options: &QueryOptions) -> ClientResult<ResultSet>;

    /// Read the rows of `table` whose keys are in `key_set`.
    ///
    /// An empty `columns` slice reads every column.
    fn read(
        &self,
        table: &str,
        key_set: &KeySet,
        columns: &[&str],
        options: &ReadOptions,
    ) -> ClientResult<ResultSet>;

    /// Read a single row by key. `Ok(None)` when no row has that key.
    fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> ClientResult<Option<Row>>;
}

/// An active read-write transaction.
pub trait TransactionHandle: ReadContext {
    /// Buffer mutations to be applied when the transaction commits.
    fn buffer(&self, mutations: Vec<Mutation>) -> ClientResult<()>;
}

/// The external database client.
pub trait DatabaseClient: Send + Sync {
    /// A read context over a fresh snapshot, valid for the reads of one call.
    fn single_use(&self) -> Box<dyn ReadContext + '_>;

    /// Apply mutations atomically outside any transaction.
    fn write(&self, mutations: Vec<Mutation>) -> ClientResult<()>;

    /// Run `work` inside a read-write transaction.
    ///
    /// Commits when `work` returns `Ok`. Any error from `work` aborts the
    /// transaction and is returned unchanged.
    fn run_in_transaction(
        &self,
        work: &mut dyn FnMut(&dyn TransactionHandle) -> DataResult<()>,
    ) -> DataResult<()>;
}
