//! Database abstraction layer.
//!
//! Provides a trait-based interface for the two database operations the
//! pipeline needs (catalog read and transactional statement execution), so
//! the live PostgreSQL backend and the in-memory mock are interchangeable.

mod mock;
mod postgres;
mod schema;
mod types;

pub use mock::{MockDatabaseClient, MockOutcome, TxEvent};
pub use postgres::PostgresClient;
pub use schema::{
    introspect_schema, CatalogEntry, ColumnSchema, SchemaDescription, TableSchema,
    SCHEMA_UNAVAILABLE,
};
pub use types::{render_row, Row, StatementOutput, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Connects to PostgreSQL using the resolved connection from `config`.
///
/// `cli_url` takes precedence over every configured source.
pub async fn connect(config: &DatabaseConfig, cli_url: Option<&str>) -> Result<PostgresClient> {
    let connection = config.resolve(cli_url)?;
    info!("Connecting to {}", connection.display_string());
    PostgresClient::connect(&connection, config).await
}

/// An open transaction scoped to one statement execution.
///
/// Dropping an uncommitted transaction rolls it back and releases its
/// connection.
#[async_trait]
pub trait SqlTransaction: Send {
    /// Runs one statement inside the transaction.
    async fn run(&mut self, sql: &str) -> Result<StatementOutput>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Trait defining the interface for database clients.
///
/// Each call acquires its own connection and releases it before returning
/// (or, for [`begin`](Self::begin), when the transaction ends).
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Reads the user-visible column catalog ordered by table name, then
    /// ordinal position.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>>;

    /// Opens a transaction for statement execution.
    async fn begin(&self) -> Result<Box<dyn SqlTransaction>>;

    /// Closes the client and its pooled connections.
    async fn close(&self) -> Result<()>;
}
