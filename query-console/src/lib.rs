//! Query Console - interactive SQL console over DuckDB-WASM
//!
//! This crate drives an in-browser analytical database from a page: it
//! starts the engine once, runs the SQL the user types, renders the result
//! as a table, and rebinds the connection when a database file is uploaded.
//! The controller is generic over the engine and the view so it runs
//! natively in tests.

use wasm_bindgen::prelude::*;

pub mod console;
pub mod dom;
pub mod duckdb;
pub mod engine;
pub mod error;
pub mod single_flight;
pub mod view;
pub mod web;

#[cfg(test)]
mod testing;

pub use console::QueryConsole;
pub use engine::{ConnectOptions, Connection, Engine, EngineFactory, RecordSet};
pub use error::{ConsoleError, EngineError};
pub use single_flight::{Flight, SingleFlight};
pub use view::ConsoleView;
pub use web::WebConsole;

// Re-export types
pub use console_types::*;

/// Initialize the query console module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(log::Level::Debug).ok();

    log::info!("Query console module loaded");
}
