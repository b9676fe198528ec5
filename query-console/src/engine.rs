//! Contract the console consumes from an embedded analytical database
//!
//! The engine itself is an external collaborator: it parses and executes
//! SQL, owns its worker and its memory. The console only needs to start it,
//! open and close connections, register uploaded files, and run queries.

use console_types::{ColumnSchema, EngineConfig, QueryResult};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Builds an engine handle from its asset configuration.
pub trait EngineFactory {
    type Engine: Engine + 'static;

    /// Spawn the worker and construct the engine object. The engine is not
    /// usable until [`Engine::instantiate`] completes.
    fn create(&self, config: &EngineConfig) -> Result<Self::Engine, EngineError>;
}

/// A running embedded database instance
#[allow(async_fn_in_trait)]
pub trait Engine {
    type Connection: Connection + 'static;

    /// Load the binary module into the worker.
    async fn instantiate(
        &self,
        wasm_url: &str,
        pthread_worker_url: Option<&str>,
    ) -> Result<(), EngineError>;

    /// Open a session, optionally bound to a registered database file.
    async fn connect(
        &self,
        options: Option<ConnectOptions>,
    ) -> Result<Self::Connection, EngineError>;

    /// Make `bytes` available to the engine under `name`.
    async fn register_file_buffer(&self, name: &str, bytes: Vec<u8>) -> Result<(), EngineError>;
}

/// A session that executes SQL against an engine
#[allow(async_fn_in_trait)]
pub trait Connection {
    async fn query(&self, sql: &str) -> Result<RecordSet, EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

/// Options for opening a connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Registered file to use as the backing database
    pub database: String,
}

/// Raw output of one query: the schema's fields and one record per row,
/// each keyed by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    pub fields: Vec<ColumnSchema>,
    pub records: Vec<Map<String, Value>>,
}

impl RecordSet {
    /// Project records into a rectangular grid following the field order.
    ///
    /// Each cell is the record's value under that column's name. A missing
    /// key yields `null`; a repeated column name yields the same value at
    /// every position it occupies.
    pub fn into_result(self, execution_time_ms: u32) -> QueryResult {
        let rows: Vec<Vec<Value>> = self
            .records
            .iter()
            .map(|record| {
                self.fields
                    .iter()
                    .map(|field| record.get(&field.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        QueryResult {
            row_count: rows.len() as u64,
            columns: self.fields,
            rows,
            execution_time_ms,
        }
    }
}
