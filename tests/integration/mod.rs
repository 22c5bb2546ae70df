//! Integration tests for nl2sql-agent.

pub mod executor_test;
pub mod pipeline_test;
pub mod schema_test;
pub mod server_test;
