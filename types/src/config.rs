//! Console configuration supplied by the host page

use serde::{Deserialize, Serialize};
use tsify::Tsify;

/// Query seeded into the SQL input once the engine is ready
pub const DEFAULT_QUERY: &str = "SELECT * FROM information_schema.tables LIMIT 50;";

/// Top-level console configuration. Every field may be omitted.
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ConsoleConfig {
    /// Engine asset locations
    #[serde(default)]
    pub engine: EngineConfig,
    /// Query placed in the SQL input after initialization
    #[serde(default = "default_query")]
    pub default_query: String,
    /// DOM element ids
    #[serde(default)]
    pub elements: ElementIds,
    /// Required extension for uploaded database files
    #[serde(default = "default_upload_extension")]
    pub upload_extension: String,
    /// Browser console log level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_query() -> String {
    DEFAULT_QUERY.to_string()
}
fn default_upload_extension() -> String {
    ".duckdb".to_string()
}
fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            default_query: default_query(),
            elements: ElementIds::default(),
            upload_extension: default_upload_extension(),
            log_level: default_log_level(),
        }
    }
}

impl ConsoleConfig {
    /// Whether `file_name` carries the configured upload extension
    pub fn accepts_upload(&self, file_name: &str) -> bool {
        file_name
            .to_ascii_lowercase()
            .ends_with(&self.upload_extension.to_ascii_lowercase())
    }
}

/// Engine asset locations
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct EngineConfig {
    /// Worker script the engine runs in
    #[serde(default = "default_worker_url")]
    pub worker_url: String,
    /// WebAssembly module the worker instantiates
    #[serde(default = "default_wasm_url")]
    pub wasm_url: String,
    /// Optional pthread worker (passed as `null` when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pthread_worker_url: Option<String>,
}

fn default_worker_url() -> String {
    "/static/duckdb/duckdb-browser-mvp.worker.js".to_string()
}
fn default_wasm_url() -> String {
    "/static/duckdb/duckdb-browser-mvp.wasm".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_url: default_worker_url(),
            wasm_url: default_wasm_url(),
            pthread_worker_url: None,
        }
    }
}

/// Ids of the page elements the console drives
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ElementIds {
    #[serde(default = "default_sql_id")]
    pub sql: String,
    #[serde(default = "default_run_id")]
    pub run: String,
    #[serde(default = "default_file_id")]
    pub file: String,
    #[serde(default = "default_file_info_id")]
    pub file_info: String,
    #[serde(default = "default_table_id")]
    pub table: String,
    #[serde(default = "default_error_id")]
    pub error: String,
}

fn default_sql_id() -> String {
    "sql".to_string()
}
fn default_run_id() -> String {
    "run".to_string()
}
fn default_file_id() -> String {
    "file".to_string()
}
fn default_file_info_id() -> String {
    "fileInfo".to_string()
}
fn default_table_id() -> String {
    "table".to_string()
}
fn default_error_id() -> String {
    "error".to_string()
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            sql: default_sql_id(),
            run: default_run_id(),
            file: default_file_id(),
            file_info: default_file_info_id(),
            table: default_table_id(),
            error: default_error_id(),
        }
    }
}
