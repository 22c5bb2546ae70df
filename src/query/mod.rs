//! Query execution.
//!
//! Isolates the execution of model-generated SQL from the orchestrator.

pub mod executor;

pub use executor::{ExecutionResult, QueryExecutor, ACKNOWLEDGED_TEXT};
