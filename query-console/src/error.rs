//! Error types for the console and the engine it drives

use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Message shown when a query is attempted without a connection
pub const NOT_READY_MESSAGE: &str = "Database not ready. Upload a .duckdb file or wait for init.";

/// Failure reported by the external database engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Extract a readable message from a thrown JavaScript value.
    pub fn from_js(value: &JsValue) -> Self {
        if let Some(error) = value.dyn_ref::<js_sys::Error>() {
            return Self(String::from(error.message()));
        }
        if let Some(message) = value.as_string() {
            return Self(message);
        }
        Self(format!("{:?}", value))
    }
}

impl From<JsValue> for EngineError {
    fn from(value: JsValue) -> Self {
        Self::from_js(&value)
    }
}

/// Errors surfaced by console operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// Engine or module failed to start
    #[error("failed to initialize database engine: {0}")]
    Init(String),

    /// File read or registration failed
    #[error("{0}")]
    Load(String),

    /// SQL failed to parse or execute
    #[error("{0}")]
    Query(String),

    /// No connection exists yet
    #[error("{}", NOT_READY_MESSAGE)]
    NotReady,
}
