//! nl2sql-agent - turns natural-language requests into SQL, runs them
//! against PostgreSQL and answers in plain language.
//!
//! This library exposes the core modules for the binary and for
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod safety;
pub mod server;
