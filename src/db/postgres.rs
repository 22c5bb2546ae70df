//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::db::{CatalogEntry, DatabaseClient, Row, SqlTransaction, StatementOutput, Value};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{
    Column as SqlxColumn, Connection, Executor, Postgres, Row as SqlxRow, Statement, TypeInfo,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Catalog query for the user-visible schema.
///
/// The ORDER BY is load-bearing: schema grouping relies on rows of one table
/// being contiguous.
const CATALOG_QUERY: &str = r#"
    SELECT table_name::text, column_name::text, data_type::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position
"#;

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PostgresClient {
    /// Connects a pool, retrying transient failures with exponential backoff.
    pub async fn connect(connection: &ConnectionConfig, config: &DatabaseConfig) -> Result<Self> {
        let conn_str = connection.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to {}", connection.display_string());
                    return Ok(Self {
                        pool,
                        statement_timeout: Duration::from_secs(config.statement_timeout_secs),
                    });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, connection)),
            None => Err(AgentError::connection("No connection attempt was made")),
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(CATALOG_QUERY)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AgentError::query(format!("Failed to fetch catalog: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(table_name, column_name, data_type)| CatalogEntry {
                table_name,
                column_name,
                data_type,
            })
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn SqlTransaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AgentError::connection(format!("Failed to start transaction: {e}")))?;

        // SET cannot take bind parameters; the value is a formatted integer.
        let set_timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        );
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))?;

        Ok(Box::new(PgTransaction { tx }))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// A pooled transaction. Dropping it without commit rolls back.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl SqlTransaction for PgTransaction {
    async fn run(&mut self, sql: &str) -> Result<StatementOutput> {
        // Generated SQL is one-off text. A statement cached by an earlier run
        // on this connection keeps its old result type and fails after DDL
        // changes the table, so start from an empty cache.
        let conn: &mut PgConnection = &mut self.tx;
        conn.clear_cached_statements()
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))?;

        // Preparing describes the result columns, which tells a row-producing
        // statement apart from one that only reports affected rows.
        let statement = (&mut *self.tx)
            .prepare(sql)
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))?;

        if statement.columns().is_empty() {
            let done = statement
                .query()
                .execute(&mut *self.tx)
                .await
                .map_err(|e| AgentError::query(format_query_error(e)))?;
            debug!("Statement affected {} rows", done.rows_affected());
            Ok(StatementOutput::Affected(done.rows_affected()))
        } else {
            let rows = statement
                .query()
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| AgentError::query(format_query_error(e)))?;
            debug!("Statement returned {} rows", rows.len());
            Ok(StatementOutput::Rows(rows.iter().map(convert_row).collect()))
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AgentError::query(format_query_error(e)))
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes `index` as `T`.
///
/// SQL NULL becomes `Value::Null`. A value the driver cannot decode becomes a
/// `<TYPE>` placeholder so it is never mistaken for NULL.
fn decode<'r, T, F>(row: &'r PgRow, index: usize, type_name: &str, map: F) -> Value
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    F: FnOnce(T) -> Value,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(Some(value)) => map(value),
        Ok(None) => Value::Null,
        Err(e) => {
            debug!("Could not decode column {} ({}): {}", index, type_name, e);
            Value::String(format!("<{type_name}>"))
        }
    }
}

fn array<T: Into<Value>>(items: Vec<Option<T>>) -> Value {
    Value::Array(items.into_iter().map(Value::from).collect())
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool, _>(row, index, type_name, Value::Bool),
        "INT2" | "SMALLINT" => decode::<i16, _>(row, index, type_name, |v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode::<i32, _>(row, index, type_name, |v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode::<i64, _>(row, index, type_name, Value::Int),
        "FLOAT4" | "REAL" => decode::<f32, _>(row, index, type_name, |v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64, _>(row, index, type_name, Value::Float),
        "NUMERIC" => decode::<Decimal, _>(row, index, type_name, |v| Value::String(v.to_string())),
        "MONEY" => decode::<PgMoney, _>(row, index, type_name, |v| {
            Value::String(v.to_decimal(2).to_string())
        }),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>, _>(row, index, type_name, |v| {
            Value::String(v.to_rfc3339())
        }),
        "TIMESTAMP" => decode::<NaiveDateTime, _>(row, index, type_name, |v| {
            Value::String(v.to_string())
        }),
        "DATE" => decode::<NaiveDate, _>(row, index, type_name, |v| Value::String(v.to_string())),
        "TIME" => decode::<NaiveTime, _>(row, index, type_name, |v| Value::String(v.to_string())),
        "INTERVAL" => decode::<PgInterval, _>(row, index, type_name, |v| {
            Value::String(format_interval(&v))
        }),
        "UUID" => decode::<Uuid, _>(row, index, type_name, |v| Value::String(v.to_string())),
        "JSON" | "JSONB" => decode::<JsonValue, _>(row, index, type_name, |v| {
            Value::String(v.to_string())
        }),
        "BYTEA" => decode::<Vec<u8>, _>(row, index, type_name, Value::Bytes),
        "BOOL[]" => decode::<Vec<Option<bool>>, _>(row, index, type_name, array),
        "INT4[]" => decode::<Vec<Option<i32>>, _>(row, index, type_name, array),
        "INT8[]" => decode::<Vec<Option<i64>>, _>(row, index, type_name, array),
        "FLOAT8[]" => decode::<Vec<Option<f64>>, _>(row, index, type_name, array),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            decode::<Vec<Option<String>>, _>(row, index, type_name, array)
        }
        // For all other types, try to get as string
        _ => decode::<String, _>(row, index, type_name, Value::String),
    }
}

/// Formats an interval the way PostgreSQL prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn format_interval(interval: &PgInterval) -> String {
    fn unit(count: i64, singular: &str, plural: &str) -> String {
        if count.abs() == 1 {
            format!("{count} {singular}")
        } else {
            format!("{count} {plural}")
        }
    }

    let mut parts = Vec::new();
    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(i64::from(interval.days), "day", "days"));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let secs = micros / 1_000_000;
        let fraction = micros % 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if fraction != 0 {
            time.push_str(format!(".{fraction:06}").trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();
    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> AgentError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        AgentError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        AgentError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        AgentError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        AgentError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        AgentError::connection(error.to_string())
    }
}

/// Formats a query error, appending PostgreSQL DETAIL/HINT when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
