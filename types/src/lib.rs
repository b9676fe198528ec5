//! Shared types for the Query Console
//!
//! All types are exported to TypeScript via tsify.

pub mod config;
pub mod data;
pub mod time;

pub use config::*;
pub use data::*;
pub use time::*;
